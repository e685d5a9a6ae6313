//! Round-activation planners.
//!
//! Both planners are pure batch computations over the active roster. They
//! never touch the store; the caller persists their output in one
//! transaction per assignment kind.

mod kpi;
mod peer;

pub use self::{
  kpi::plan_kpi_assignments,
  peer::{PeerPlan, plan_peer_assignments},
};

#[cfg(test)]
pub(crate) mod fixtures {
  use uuid::Uuid;

  use crate::round::Person;

  pub fn person(role: &str) -> Person {
    Person {
      person_id:  Uuid::new_v4(),
      name:       format!("{role} holder"),
      role:       role.into(),
      department: "Operations".into(),
      manager_id: None,
      active:     true,
    }
  }
}
