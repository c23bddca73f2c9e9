//! Who a record is: its class, the id the backend gave it, when the backend
//! says it was created/updated, and its ACL.

use crate::error::{RError, RResult};
use crate::models::acl::Acl;
use crate::models::pointer::Pointer;
use crate::models::validate;
use crate::util::Timestamp;

#[derive(Debug, Clone)]
pub struct Identity {
    class_name: String,
    object_id: Option<String>,
    created_at: Option<Timestamp>,
    updated_at: Option<Timestamp>,
    acl: Option<Acl>,
}

impl Identity {
    /// A brand new, never-saved identity
    pub fn new(class_name: &str) -> RResult<Identity> {
        validate::class_name(class_name)?;
        Ok(Identity {
            class_name: String::from(class_name),
            object_id: None,
            created_at: None,
            updated_at: None,
            acl: None,
        })
    }

    /// An identity that already exists on the server. Only for building a
    /// record out of server data: the caller fills in the timestamps with
    /// `apply_fetch` before anyone sees it.
    pub fn existing(class_name: &str, object_id: &str) -> RResult<Identity> {
        if object_id.is_empty() {
            return Err(RError::Validation(format!("{}: empty objectId", class_name)));
        }
        let mut identity = Identity::new(class_name)?;
        identity.object_id = Some(String::from(object_id));
        Ok(identity)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn object_id(&self) -> Option<&String> {
        self.object_id.as_ref()
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    pub fn acl(&self) -> Option<&Acl> {
        self.acl.as_ref()
    }

    pub fn set_acl(&mut self, acl: Option<Acl>) {
        self.acl = acl;
    }

    /// Our address, if we have one
    pub fn pointer(&self) -> RResult<Pointer> {
        match self.object_id {
            Some(ref id) => Ok(Pointer::new(self.class_name.clone(), id.clone())),
            None => Err(RError::NotSaved(format!("{} has no objectId", self.class_name))),
        }
    }

    /// Merge a save response into the identity. The id and createdAt go from
    /// absent to present exactly once; updatedAt always takes the new value.
    pub fn apply_save_result(&mut self, object_id: &str, created_at: Timestamp, updated_at: Timestamp) -> RResult<()> {
        if object_id.is_empty() {
            return Err(RError::InvalidState(format!("{}: server returned an empty objectId", self.class_name)));
        }
        if let Some(ref existing) = self.object_id {
            if existing != object_id {
                return Err(RError::InvalidState(format!("{}: objectId {} cannot become {}", self.class_name, existing, object_id)));
            }
        }
        if self.object_id.is_none() {
            self.object_id = Some(String::from(object_id));
        }
        if self.created_at.is_none() {
            self.created_at = Some(created_at);
        }
        self.updated_at = Some(updated_at);
        Ok(())
    }

    /// Take the server's word on timestamps and ACL (refresh)
    pub fn apply_fetch(&mut self, created_at: Timestamp, updated_at: Timestamp, acl: Option<Acl>) {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
        self.acl = acl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_nothing() {
        let identity = Identity::new("Note").unwrap();
        assert_eq!(identity.class_name(), "Note");
        assert_eq!(identity.object_id(), None);
        assert_eq!(identity.created_at(), None);
        assert!(identity.pointer().is_err());
        assert!(Identity::new("9lives").is_err());
        assert!(Identity::existing("Note", "").is_err());
    }

    #[test]
    fn save_result_assigns_once() {
        let mut identity = Identity::new("Note").unwrap();
        identity.apply_save_result("abc", 100, 100).unwrap();
        assert_eq!(identity.object_id(), Some(&String::from("abc")));
        assert_eq!(identity.created_at(), Some(100));

        // same id: createdAt sticks, updatedAt moves
        identity.apply_save_result("abc", 555, 200).unwrap();
        assert_eq!(identity.created_at(), Some(100));
        assert_eq!(identity.updated_at(), Some(200));

        match identity.apply_save_result("xyz", 300, 300) {
            Err(RError::InvalidState(_)) => (),
            _ => panic!("expected InvalidState"),
        }
        assert_eq!(identity.object_id(), Some(&String::from("abc")));
        assert_eq!(identity.updated_at(), Some(200));
        assert_eq!(identity.pointer().unwrap(), Pointer::new("Note", "abc"));
    }
}
