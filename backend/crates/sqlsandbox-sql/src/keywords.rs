//! Keywords that mark a query as write or privilege-changing.

use std::fmt;
use std::str::FromStr;

/// Statement keywords that are never admitted, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeniedKeyword {
    Drop,
    Delete,
    Truncate,
    Alter,
    Create,
    Insert,
    Update,
    Grant,
    Revoke,
    Execute,
    Merge,
}

impl DeniedKeyword {
    pub const ALL: [DeniedKeyword; 11] = [
        DeniedKeyword::Drop,
        DeniedKeyword::Delete,
        DeniedKeyword::Truncate,
        DeniedKeyword::Alter,
        DeniedKeyword::Create,
        DeniedKeyword::Insert,
        DeniedKeyword::Update,
        DeniedKeyword::Grant,
        DeniedKeyword::Revoke,
        DeniedKeyword::Execute,
        DeniedKeyword::Merge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeniedKeyword::Drop => "DROP",
            DeniedKeyword::Delete => "DELETE",
            DeniedKeyword::Truncate => "TRUNCATE",
            DeniedKeyword::Alter => "ALTER",
            DeniedKeyword::Create => "CREATE",
            DeniedKeyword::Insert => "INSERT",
            DeniedKeyword::Update => "UPDATE",
            DeniedKeyword::Grant => "GRANT",
            DeniedKeyword::Revoke => "REVOKE",
            DeniedKeyword::Execute => "EXECUTE",
            DeniedKeyword::Merge => "MERGE",
        }
    }

    /// First keyword that occurs anywhere in `upper` as a substring.
    ///
    /// `upper` must already be uppercased.
    pub fn find_substring(upper: &str) -> Option<DeniedKeyword> {
        Self::ALL.into_iter().find(|kw| upper.contains(kw.as_str()))
    }
}

impl fmt::Display for DeniedKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeniedKeyword {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kw| kw.as_str() == upper)
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match_is_positional() {
        assert_eq!(DeniedKeyword::find_substring("SELECT 1; DROP TABLE T"), Some(DeniedKeyword::Drop));
        assert_eq!(
            DeniedKeyword::find_substring("SELECT LAST_UPDATE FROM T"),
            Some(DeniedKeyword::Update)
        );
        assert_eq!(DeniedKeyword::find_substring("SELECT NAME FROM T"), None);
    }

    #[test]
    fn test_from_str_exact_word_only() {
        assert_eq!("merge".parse::<DeniedKeyword>(), Ok(DeniedKeyword::Merge));
        assert!("last_update".parse::<DeniedKeyword>().is_err());
    }
}
