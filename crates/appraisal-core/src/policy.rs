//! Organization policy: who may KPI-rate whom, whose ratings are
//! authoritative, and which roles count as strategic.
//!
//! All role names are data. The policy is deserialized from configuration and
//! every label is normalized with [`normalize_role`] when the policy is built.
//!
//! ```toml
//! [policy.evaluator_aliases]
//! "Operations Manager" = "Ops Manager"
//!
//! [[policy.hierarchy]]
//! manager = "Ops Manager"
//! subordinates = [{ match = "prefix", role = "Ops", except = ["Ops Manager"] }]
//!
//! [[policy.authority]]
//! ratee = { match = "prefix", role = "DP", except = ["DP Supervisor"] }
//! rater = "DP Supervisor"
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::relationship::{InteractionScope, Relationship, normalize_role};

// ─── RolePattern ─────────────────────────────────────────────────────────────

/// Matches subordinate or ratee role labels.
///
/// A prefix matches at a word boundary only: `Ops` matches `Ops 1` and
/// `Ops Lebanon`, but neither `Ops` itself nor `Opsmanager`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PatternRepr")]
pub enum RolePattern {
  Exact(String),
  Prefix { prefix: String, except: Vec<String> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternRepr {
  Label(String),
  Tagged(TaggedPattern),
}

#[derive(Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
enum TaggedPattern {
  Exact {
    role: String,
  },
  Prefix {
    role:   String,
    #[serde(default)]
    except: Vec<String>,
  },
}

impl From<PatternRepr> for RolePattern {
  fn from(repr: PatternRepr) -> Self {
    match repr {
      PatternRepr::Label(role) | PatternRepr::Tagged(TaggedPattern::Exact { role }) => {
        Self::exact(&role)
      }
      PatternRepr::Tagged(TaggedPattern::Prefix { role, except }) => {
        Self::prefix(&role, except.iter().map(String::as_str))
      }
    }
  }
}

impl RolePattern {
  pub fn exact(role: &str) -> Self { Self::Exact(normalize_role(role)) }

  pub fn prefix<'a>(prefix: &str, except: impl IntoIterator<Item = &'a str>) -> Self {
    Self::Prefix {
      prefix: normalize_role(prefix),
      except: except.into_iter().map(normalize_role).collect(),
    }
  }

  pub fn matches(&self, role: &str) -> bool {
    let role = normalize_role(role);
    match self {
      Self::Exact(exact) => role == *exact,
      Self::Prefix { prefix, except } => {
        role
          .strip_prefix(prefix.as_str())
          .is_some_and(|rest| rest.starts_with(' '))
          && !except.contains(&role)
      }
    }
  }
}

// ─── Policy data ─────────────────────────────────────────────────────────────

/// Manager role → subordinate role patterns the manager may KPI-rate.
#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyRule {
  pub manager:      String,
  pub subordinates: Vec<RolePattern>,
}

/// Ratee role pattern → the single rater role whose KPI ratings count.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityRule {
  pub ratee: RolePattern,
  pub rater: String,
}

/// Raw, deserialized form of [`OrgPolicy`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
  pub evaluator_aliases: HashMap<String, String>,
  pub hierarchy:         Vec<HierarchyRule>,
  pub authority:         Vec<AuthorityRule>,
  pub strategic_roles:   Vec<RolePattern>,
}

// ─── OrgPolicy ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "PolicyConfig")]
pub struct OrgPolicy {
  aliases:   HashMap<String, String>,
  hierarchy: HashMap<String, Vec<RolePattern>>,
  authority: Vec<(RolePattern, String)>,
  strategic: Vec<RolePattern>,
}

impl From<PolicyConfig> for OrgPolicy {
  fn from(config: PolicyConfig) -> Self {
    let aliases = config
      .evaluator_aliases
      .iter()
      .map(|(alias, canonical)| (normalize_role(alias), normalize_role(canonical)))
      .collect();

    let mut hierarchy: HashMap<String, Vec<RolePattern>> = HashMap::new();
    for rule in config.hierarchy {
      hierarchy
        .entry(normalize_role(&rule.manager))
        .or_default()
        .extend(rule.subordinates);
    }

    let authority = config
      .authority
      .into_iter()
      .map(|rule| (rule.ratee, normalize_role(&rule.rater)))
      .collect();

    Self {
      aliases,
      hierarchy,
      authority,
      strategic: config.strategic_roles,
    }
  }
}

impl OrgPolicy {
  pub fn has_hierarchy(&self) -> bool { !self.hierarchy.is_empty() }

  /// Normalized manager role after alias substitution.
  pub fn canonical_manager(&self, role: &str) -> String {
    let role = normalize_role(role);
    self.aliases.get(&role).cloned().unwrap_or(role)
  }

  /// Subordinate patterns for `manager_role`; empty when the role manages
  /// nobody.
  pub fn resolve_hierarchy(&self, manager_role: &str) -> &[RolePattern] {
    self
      .hierarchy
      .get(&self.canonical_manager(manager_role))
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  pub fn may_rate(&self, manager_role: &str, subordinate_role: &str) -> bool {
    self
      .resolve_hierarchy(manager_role)
      .iter()
      .any(|p| p.matches(subordinate_role))
  }

  /// The authoritative rater role for `ratee_role`, first matching rule wins.
  pub fn authoritative_rater(&self, ratee_role: &str) -> Option<&str> {
    self
      .authority
      .iter()
      .find(|(pattern, _)| pattern.matches(ratee_role))
      .map(|(_, rater)| rater.as_str())
  }

  /// Whether `rater_role` is (an alias of) `authoritative`.
  pub fn is_role(&self, rater_role: &str, authoritative: &str) -> bool {
    self.canonical_manager(rater_role) == self.canonical_manager(authoritative)
  }

  pub fn interaction_scope(
    &self,
    relationship: Relationship,
    rater_role: &str,
    ratee_role: &str,
  ) -> InteractionScope {
    if relationship != Relationship::Direct {
      return InteractionScope::Indirect;
    }
    if self.may_rate(rater_role, ratee_role) || self.may_rate(ratee_role, rater_role) {
      return InteractionScope::Managerial;
    }
    if self.strategic.iter().any(|p| p.matches(rater_role)) {
      return InteractionScope::Strategic;
    }
    InteractionScope::Operational
  }
}
