use std::fmt;

use super::domain::{AgentId, Caller, Citation, CitationId, CitationStatus, CitizenId};

/// Guarded operations on persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    ChangeStatus,
    DeleteCitation,
    DeleteCitizen,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleAction::ChangeStatus => "change the statut of this citation",
            LifecycleAction::DeleteCitation => "delete citations",
            LifecycleAction::DeleteCitizen => "delete citizens",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("agent {caller} may not {action}")]
    Unauthorized {
        caller: AgentId,
        action: LifecycleAction,
    },
    #[error("citation {citation} is already {from} and cannot move to {to}")]
    InvalidTransition {
        citation: CitationId,
        from: CitationStatus,
        to: CitationStatus,
    },
    #[error("citizen {citizen} still has {citations} citation(s) and cannot be deleted")]
    CitizenHasCitations { citizen: CitizenId, citations: usize },
}

/// Result of an authorized status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied {
        from: CitationStatus,
        to: CitationStatus,
    },
    Unchanged(CitationStatus),
}

/// Status state machine: `En cours` moves to one of the terminal statuses.
pub struct CitationLifecycle;

impl CitationLifecycle {
    /// Check that `caller` may move `citation` to `target`.
    ///
    /// Authorization is checked before the transition itself, so an unauthorized
    /// caller learns nothing about the citation's state.
    pub fn transition(
        citation: &Citation,
        caller: &Caller,
        target: CitationStatus,
    ) -> Result<Transition, LifecycleError> {
        if !(caller.is_admin() || caller.id == citation.agent_id) {
            return Err(LifecycleError::Unauthorized {
                caller: caller.id,
                action: LifecycleAction::ChangeStatus,
            });
        }

        let current = citation.statut;
        if current == target {
            return Ok(Transition::Unchanged(current));
        }
        if current.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                citation: citation.id,
                from: current,
                to: target,
            });
        }

        Ok(Transition::Applied {
            from: current,
            to: target,
        })
    }

    /// Only admins delete citations, whatever their statut.
    pub fn authorize_deletion(caller: &Caller) -> Result<(), LifecycleError> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(LifecycleError::Unauthorized {
                caller: caller.id,
                action: LifecycleAction::DeleteCitation,
            })
        }
    }

    /// Citizens are deleted by admins, and only once no citation references them.
    pub fn authorize_citizen_deletion(
        caller: &Caller,
        citizen: CitizenId,
        referencing_citations: usize,
    ) -> Result<(), LifecycleError> {
        if !caller.is_admin() {
            return Err(LifecycleError::Unauthorized {
                caller: caller.id,
                action: LifecycleAction::DeleteCitizen,
            });
        }
        if referencing_citations > 0 {
            return Err(LifecycleError::CitizenHasCitations {
                citizen,
                citations: referencing_citations,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::domain::NewCitation;
    use chrono::Utc;

    fn citation_by(author: u64, statut: CitationStatus) -> Citation {
        let mut citation = NewCitation {
            agent_id: AgentId(author),
            citoyen_id: None,
            citoyen_nom: "MARTIN".to_string(),
            citoyen_prenom: "Luc".to_string(),
            amende_id: None,
            montant_applique: None,
            description: String::new(),
            lieu: None,
            est_recidive: false,
            date_creation: Utc::now(),
        }
        .into_citation(CitationId(7));
        citation.statut = statut;
        citation
    }

    #[test]
    fn author_moves_open_citation_to_terminal_status() {
        let citation = citation_by(3, CitationStatus::EnCours);
        for target in [CitationStatus::Valide, CitationStatus::Rejete, CitationStatus::Paye] {
            assert_eq!(
                CitationLifecycle::transition(&citation, &Caller::agent(3), target),
                Ok(Transition::Applied {
                    from: CitationStatus::EnCours,
                    to: target,
                })
            );
        }
    }

    #[test]
    fn admin_may_change_any_citation() {
        let citation = citation_by(3, CitationStatus::EnCours);
        assert!(
            CitationLifecycle::transition(&citation, &Caller::admin(1), CitationStatus::Paye)
                .is_ok()
        );
    }

    #[test]
    fn other_agents_are_rejected() {
        let citation = citation_by(3, CitationStatus::EnCours);
        assert_eq!(
            CitationLifecycle::transition(&citation, &Caller::agent(4), CitationStatus::Valide),
            Err(LifecycleError::Unauthorized {
                caller: AgentId(4),
                action: LifecycleAction::ChangeStatus,
            })
        );
    }

    #[test]
    fn terminal_statuses_do_not_move() {
        let citation = citation_by(3, CitationStatus::Rejete);
        assert_eq!(
            CitationLifecycle::transition(&citation, &Caller::admin(1), CitationStatus::Paye),
            Err(LifecycleError::InvalidTransition {
                citation: CitationId(7),
                from: CitationStatus::Rejete,
                to: CitationStatus::Paye,
            })
        );
        assert_eq!(
            CitationLifecycle::transition(&citation, &Caller::agent(3), CitationStatus::Rejete),
            Ok(Transition::Unchanged(CitationStatus::Rejete))
        );
    }

    #[test]
    fn deletion_requires_admin() {
        assert!(CitationLifecycle::authorize_deletion(&Caller::admin(1)).is_ok());
        assert!(matches!(
            CitationLifecycle::authorize_deletion(&Caller::agent(3)),
            Err(LifecycleError::Unauthorized {
                action: LifecycleAction::DeleteCitation,
                ..
            })
        ));
    }

    #[test]
    fn citizen_deletion_blocked_by_references() {
        assert_eq!(
            CitationLifecycle::authorize_citizen_deletion(&Caller::admin(1), CitizenId(9), 1),
            Err(LifecycleError::CitizenHasCitations {
                citizen: CitizenId(9),
                citations: 1,
            })
        );
        assert!(
            CitationLifecycle::authorize_citizen_deletion(&Caller::admin(1), CitizenId(9), 0)
                .is_ok()
        );
        assert!(matches!(
            CitationLifecycle::authorize_citizen_deletion(&Caller::agent(2), CitizenId(9), 0),
            Err(LifecycleError::Unauthorized { .. })
        ));
    }
}
