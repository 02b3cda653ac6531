//! Handing items to the operating system.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// What to open for a current item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "lowercase")]
pub enum OpenTarget {
    File(PathBuf),
    Url(String),
}

impl fmt::Display for OpenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenTarget::File(path) => write!(f, "{}", path.display()),
            OpenTarget::Url(url) => f.write_str(url),
        }
    }
}

/// Opens files in the default application and URLs in the browser.
pub trait Opener {
    fn open(&self, target: &OpenTarget) -> std::io::Result<()>;
}

/// Hands targets to the desktop's default handler without waiting for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl Opener for SystemOpener {
    fn open(&self, target: &OpenTarget) -> std::io::Result<()> {
        match target {
            OpenTarget::File(path) => open::that_detached(path),
            OpenTarget::Url(url) => open::that_detached(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_json() {
        let file = OpenTarget::File(PathBuf::from("/media/2021-03-01;Pilot.mp4"));
        assert_eq!(file.to_string(), "/media/2021-03-01;Pilot.mp4");

        let url = OpenTarget::Url("https://example.com/a".to_string());
        assert_eq!(
            serde_json::to_string(&url).unwrap(),
            r#"{"kind":"url","target":"https://example.com/a"}"#
        );
    }
}
