//! # Access
//!
//! Access is derived from a node's own collaborator sets; there is no
//! inheritance at check time. Cascades are what copy a folder's
//! collaborators onto its descendants.
//!
//! | role    | Read | Write | Manage                     |
//! |---------|------|-------|----------------------------|
//! | owner   | yes  | yes   | yes                        |
//! | editor  | yes  | yes   | if `editors_can_share`     |
//! | viewer  | yes  | no    | no                         |

use serde::{Deserialize, Serialize};

use super::node::{Node, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    /// List or download.
    Read,
    /// Change content, create children, move in or out.
    Write,
    /// Add or remove collaborators.
    Manage,
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessType::Read => write!(f, "read"),
            AccessType::Write => write!(f, "write"),
            AccessType::Manage => write!(f, "manage"),
        }
    }
}

impl AccessType {
    pub fn permits(self, node: &Node, user: &UserId) -> bool {
        if node.owner == *user {
            return true;
        }
        match self {
            AccessType::Read => node.is_editor(user) || node.is_viewer(user),
            AccessType::Write => node.is_editor(user),
            AccessType::Manage => node.is_editor(user) && node.editors_can_share,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_roles() {
        let mut node = Node::folder("o".into(), "f", Uuid::new_v4());
        node.add_collaborators(&[UserId::from("e")], &[UserId::from("v")]);

        let (o, e, v, x) = ("o".into(), "e".into(), "v".into(), "x".into());
        assert!(AccessType::Manage.permits(&node, &o));
        assert!(AccessType::Write.permits(&node, &e));
        assert!(!AccessType::Manage.permits(&node, &e));
        assert!(AccessType::Read.permits(&node, &v));
        assert!(!AccessType::Write.permits(&node, &v));
        assert!(!AccessType::Read.permits(&node, &x));

        node.editors_can_share = true;
        assert!(AccessType::Manage.permits(&node, &e));
    }
}
