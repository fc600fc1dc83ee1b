//! CTS URN helpers.
//!
//! A CTS URN looks like `urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:1.10`:
//! namespace, then a dotted work component (text group, work, version,
//! exemplar), then an optional passage reference.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UrnLevel {
    Namespace,
    TextGroup,
    Work,
    Version,
    Exemplar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Urn {
    namespace: String,
    work_parts: Vec<String>,
}

impl Urn {
    pub fn parse(value: &str) -> Option<Urn> {
        let mut parts = value.splitn(5, ':');
        if parts.next()? != "urn" || parts.next()? != "cts" {
            return None;
        }
        let namespace = parts.next()?.to_string();
        let work_parts: Vec<String> = match parts.next() {
            Some(w) if !w.is_empty() => w.split('.').map(str::to_string).collect(),
            _ => Vec::new(),
        };
        if namespace.is_empty() {
            return None;
        }
        Some(Urn {
            namespace,
            work_parts,
        })
    }

    /// Truncates the URN to `level`, keeping the trailing `:` the stored
    /// URNs use (`urn:cts:greekLit:tlg0012.tlg001:`).
    pub fn up_to(&self, level: UrnLevel) -> Option<String> {
        let keep = match level {
            UrnLevel::Namespace => 0,
            UrnLevel::TextGroup => 1,
            UrnLevel::Work => 2,
            UrnLevel::Version => 3,
            UrnLevel::Exemplar => 4,
        };
        if self.work_parts.len() < keep {
            return None;
        }
        if keep == 0 {
            return Some(format!("urn:cts:{}:", self.namespace));
        }
        Some(format!(
            "urn:cts:{}:{}:",
            self.namespace,
            self.work_parts[..keep].join(".")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_to_work() {
        let urn = Urn::parse("urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:1.1").unwrap();
        assert_eq!(
            urn.up_to(UrnLevel::Work).as_deref(),
            Some("urn:cts:greekLit:tlg0012.tlg001:")
        );
        assert_eq!(
            urn.up_to(UrnLevel::TextGroup).as_deref(),
            Some("urn:cts:greekLit:tlg0012:")
        );
        assert_eq!(
            urn.up_to(UrnLevel::Namespace).as_deref(),
            Some("urn:cts:greekLit:")
        );
        assert_eq!(urn.up_to(UrnLevel::Exemplar), None);
    }

    #[test]
    fn test_version_urn_without_passage() {
        let urn = Urn::parse("urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:").unwrap();
        assert_eq!(
            urn.up_to(UrnLevel::Version).as_deref(),
            Some("urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:")
        );
    }

    #[test]
    fn test_rejects_non_cts() {
        assert!(Urn::parse("urn:isbn:12345").is_none());
        assert!(Urn::parse("tlg0012").is_none());
    }
}
