/// A header tag that can be looked up, filtered on, or formatted.
///
/// Tag names are matched case-insensitively and may carry the conventional
/// `RPMTAG_` prefix, so `name`, `NAME` and `RPMTAG_NAME` all resolve to
/// [`Tag::Name`].
///
/// # Example
///
/// ```
/// use pkgcursor_schema::Tag;
///
/// assert_eq!(Tag::from_name("RPMTAG_NAME"), Some(Tag::Name));
/// assert_eq!(Tag::from_name("requires"), Some(Tag::RequireName));
/// assert_eq!(Tag::from_name("bogus"), None);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    /// Package name.
    Name,
    /// Optional epoch.
    Epoch,
    /// Upstream version.
    Version,
    /// Distribution release.
    Release,
    /// Target architecture.
    Arch,
    /// One-line summary.
    Summary,
    /// Capabilities provided by the package.
    ProvideName,
    /// Capabilities required by the package.
    RequireName,
    /// File basenames shipped by the package.
    Basenames,
    /// Name of the source package this was built from.
    SourceRpm,
}

impl Tag {
    /// Every tag, in declaration order.
    pub const ALL: [Tag; 10] = [
        Tag::Name,
        Tag::Epoch,
        Tag::Version,
        Tag::Release,
        Tag::Arch,
        Tag::Summary,
        Tag::ProvideName,
        Tag::RequireName,
        Tag::Basenames,
        Tag::SourceRpm,
    ];

    /// Canonical lowercase tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Epoch => "epoch",
            Self::Version => "version",
            Self::Release => "release",
            Self::Arch => "arch",
            Self::Summary => "summary",
            Self::ProvideName => "providename",
            Self::RequireName => "requirename",
            Self::Basenames => "basenames",
            Self::SourceRpm => "sourcerpm",
        }
    }

    /// Resolve a tag from its name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let bare = lower.strip_prefix("rpmtag_").unwrap_or(&lower);
        match bare {
            "provides" => return Some(Self::ProvideName),
            "requires" => return Some(Self::RequireName),
            _ => {}
        }
        Self::ALL.into_iter().find(|t| t.as_str() == bare)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown tag: \"{s}\""))
    }
}
