//! Configuration reference namespaces.
//!
//! Objects documented with the `cylc` domain are named with a compact syntax:
//! `conf[section1][section2][section3]setting = value`, or `conf|setting` when
//! a setting sits directly under the configuration file. References may be
//! partial (`[runtime]script`) and are resolved relative to a context.

use crate::error::NamespaceError;
use crate::index::{ResolvedObject, SearchIndex};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Domain prefix of configuration objects in the index's `objtypes` table.
pub const DOMAIN: &str = "cylc";

/// Deepest number of sections a namespace may name.
pub const MAX_SECTIONS: usize = 3;

/// A name component: may open with `<` and close with `>` for placeholder
/// sections, and contain inner spaces and dots.
const WORD: &str = r"(?:[<\w\-])?(?:[\w\-][\w\- .]+)?[\w>]";

static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    let sections = format!(r"(?:\[{WORD}\]){{1,{MAX_SECTIONS}}}");
    let pattern = format!(
        r"^(?:(?P<conf>{WORD})(?:(?P<sections>{sections})|\|)|(?P<bare_sections>{sections})|\|)?(?P<setting>{WORD})?(?:\s*=\s*(?P<value>.*))?$"
    );
    Regex::new(&pattern).expect("namespace pattern is valid")
});

static SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").expect("section pattern is valid"));

/// Component kinds, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Conf,
    Section,
    Setting,
    Value,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Conf, Kind::Section, Kind::Setting, Kind::Value];

    pub const fn as_str(self) -> &'static str {
        match self {
            Kind::Conf => "conf",
            Kind::Section => "section",
            Kind::Setting => "setting",
            Kind::Value => "value",
        }
    }

    /// `domain:role` string used in the index's `objtypes` table.
    pub fn objtype(self) -> String {
        format!("{}:{}", DOMAIN, self.as_str())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = s.strip_prefix("cylc:").unwrap_or(s);
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str() == role)
            .ok_or_else(|| format!("unknown namespace kind '{}'", s))
    }
}

/// A parsed, possibly partial, configuration namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub conf: Option<String>,
    pub sections: Vec<String>,
    pub setting: Option<String>,
    pub value: Option<String>,
}

impl Namespace {
    /// Parses namespace text. Empty components are stored as absent.
    pub fn parse(text: &str) -> Result<Self, NamespaceError> {
        let invalid = || NamespaceError(text.to_string());
        let caps = NAMESPACE.captures(text).ok_or_else(invalid)?;

        let owned = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let sections = caps
            .name("sections")
            .or_else(|| caps.name("bare_sections"))
            .map(|m| {
                SECTION
                    .captures_iter(m.as_str())
                    .filter_map(|c| c.get(1))
                    .map(|s| s.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            conf: owned("conf"),
            sections,
            setting: owned("setting"),
            value: owned("value"),
        })
    }

    /// A namespace holding only one component, as written in a role such as
    /// `:cylc:setting:`.
    pub fn single(kind: Kind, text: &str) -> Self {
        let mut ns = Self::default();
        let text = Some(text.to_string()).filter(|s| !s.is_empty());
        match kind {
            Kind::Conf => ns.conf = text,
            Kind::Section => ns.sections = text.into_iter().collect(),
            Kind::Setting => ns.setting = text,
            Kind::Value => ns.value = text,
        }
        ns
    }

    pub fn is_empty(&self) -> bool {
        self.populated().next().is_none()
    }

    /// Deepest populated component.
    pub fn kind(&self) -> Option<Kind> {
        self.populated().last()
    }

    fn has(&self, kind: Kind) -> bool {
        match kind {
            Kind::Conf => self.conf.is_some(),
            Kind::Section => !self.sections.is_empty(),
            Kind::Setting => self.setting.is_some(),
            Kind::Value => self.value.is_some(),
        }
    }

    fn populated(&self) -> impl DoubleEndedIterator<Item = Kind> + '_ {
        Kind::ALL.into_iter().filter(|k| self.has(*k))
    }

    /// Overlays this (possibly partial) reference onto `base`.
    ///
    /// Components above the first one this reference names come from `base`;
    /// from that component down, everything comes from this reference.
    pub fn relative_to(&self, base: &Namespace) -> Namespace {
        let mut ret = base.clone();
        let mut overridden = false;
        for kind in Kind::ALL {
            overridden |= self.has(kind);
            if !overridden {
                continue;
            }
            match kind {
                Kind::Conf => ret.conf.clone_from(&self.conf),
                Kind::Section => ret.sections.clone_from(&self.sections),
                Kind::Setting => ret.setting.clone_from(&self.setting),
                Kind::Value => ret.value.clone_from(&self.value),
            }
        }
        ret
    }

    /// Copy without the value component.
    pub fn without_value(&self) -> Namespace {
        Namespace {
            value: None,
            ..self.clone()
        }
    }
}

impl FromStr for Namespace {
    type Err = NamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(conf) = &self.conf {
            f.write_str(conf)?;
        }
        for section in &self.sections {
            write!(f, "[{}]", section)?;
        }
        if let Some(setting) = &self.setting {
            if self.conf.is_some() && self.sections.is_empty() {
                f.write_str("|")?;
            }
            f.write_str(setting)?;
        }
        if let Some(value) = &self.value {
            write!(f, "={}", value)?;
        }
        Ok(())
    }
}

/// Resolves a configuration reference against the index's `cylc` objects.
///
/// `role` is the kind of object the reference names; a reference with fewer
/// than two components is read as that single component, so `[runtime]`
/// style context applies. `context` supplies the enclosing namespace for
/// relative references.
pub fn resolve_conf<'a>(
    index: &'a SearchIndex,
    target: &str,
    role: Option<Kind>,
    context: Option<&Namespace>,
) -> Result<(Namespace, Vec<ResolvedObject<'a>>), NamespaceError> {
    let mut reference = Namespace::parse(target)?;
    if let Some(role) = role
        && reference.populated().count() < 2
    {
        reference = Namespace::single(role, target);
    }

    let resolved = match context {
        Some(base) => reference.relative_to(base),
        None => reference,
    };
    let shown = resolved.to_string();

    let matches = index
        .objects()
        .into_iter()
        .filter(|o| o.objtype.is_some_and(|t| t.starts_with("cylc:")))
        .filter(|o| o.fullname == shown)
        .collect::<Vec<_>>();

    tracing::debug!(
        "Resolved configuration reference {:?} to {:?}: {} matches",
        target,
        shown,
        matches.len()
    );

    Ok((resolved, matches))
}
