/// Represents ways to locate an element on the remote page.
///
/// A selector is a strategy plus a value; it is resolved fresh on each
/// lookup because the remote DOM may replace the underlying node at any
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select by element id attribute
    Id(String),
    /// Select by CSS selector
    Css(String),
    /// Select using an XPath expression
    XPath(String),
    /// Select by style class name
    ClassName(String),
    /// Select anchors whose display text contains the given fragment
    LinkTextContains(String),
    /// Select by tag name
    Tag(String),
}

impl Selector {
    pub fn id(value: impl Into<String>) -> Self {
        Selector::Id(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Selector::ClassName(value.into())
    }

    pub fn link_text_contains(value: impl Into<String>) -> Self {
        Selector::LinkTextContains(value.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Selector::Tag(value.into())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Id(v) => write!(f, "id:{v}"),
            Selector::Css(v) => write!(f, "css:{v}"),
            Selector::XPath(v) => write!(f, "xpath:{v}"),
            Selector::ClassName(v) => write!(f, "classname:{v}"),
            Selector::LinkTextContains(v) => write!(f, "linktext:{v}"),
            Selector::Tag(v) => write!(f, "tag:{v}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        match s {
            _ if s.starts_with("id:") => Selector::Id(s[3..].to_string()),
            _ if s.starts_with("css:") => Selector::Css(s[4..].to_string()),
            _ if s.starts_with("xpath:") => Selector::XPath(s[6..].to_string()),
            _ if s.to_lowercase().starts_with("classname:") => {
                let parts: Vec<&str> = s.splitn(2, ':').collect();
                Selector::ClassName(parts[1].to_string())
            }
            _ if s.to_lowercase().starts_with("linktext:") => {
                let parts: Vec<&str> = s.splitn(2, ':').collect();
                Selector::LinkTextContains(parts[1].to_string())
            }
            _ if s.starts_with("tag:") => Selector::Tag(s[4..].to_string()),
            _ if s.starts_with('#') => Selector::Id(s[1..].to_string()),
            _ if s.starts_with('/') || s.starts_with('(') => Selector::XPath(s.to_string()),
            _ => Selector::Css(s.to_string()),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_strategies() {
        assert_eq!(Selector::from("id:username"), Selector::Id("username".into()));
        assert_eq!(
            Selector::from("css:a.btn-link.btn-condensed"),
            Selector::Css("a.btn-link.btn-condensed".into())
        );
        assert_eq!(
            Selector::from("xpath://td[contains(@onclick, 'next')]"),
            Selector::XPath("//td[contains(@onclick, 'next')]".into())
        );
        assert_eq!(
            Selector::from("classname:dropdown-toggle"),
            Selector::ClassName("dropdown-toggle".into())
        );
        assert_eq!(Selector::from("tag:iframe"), Selector::Tag("iframe".into()));
    }

    #[test]
    fn parses_shorthand_forms() {
        assert_eq!(Selector::from("#kc-login"), Selector::Id("kc-login".into()));
        assert_eq!(
            Selector::from("//a[contains(text(), 'Prosseguir')]"),
            Selector::XPath("//a[contains(text(), 'Prosseguir')]".into())
        );
        assert_eq!(
            Selector::from("(//processo-datalist-card)[3]"),
            Selector::XPath("(//processo-datalist-card)[3]".into())
        );
        // No recognized prefix falls back to CSS
        assert_eq!(
            Selector::from("li#liConsultaProcessual i.fas"),
            Selector::Css("li#liConsultaProcessual i.fas".into())
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        let selectors = [
            Selector::id("fPP:searchProcessos"),
            Selector::css("a.btn-link"),
            Selector::xpath("//tfoot//span"),
            Selector::class_name("dropdown-toggle"),
            Selector::link_text_contains("Diretor de Secretaria"),
            Selector::tag("iframe"),
        ];
        for sel in selectors {
            assert_eq!(Selector::from(sel.to_string().as_str()), sel);
        }
    }
}
