use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    schema::{Id, User, UserRole},
};

use super::permissions::ActionType;

/// The authenticated identity an operation runs as. Produced by the web layer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Unauthorized(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }

    /// Ok when the session owns `owner_id` or may manage everything through `override_action`.
    pub fn authenticate_owner(
        &self,
        owner_id: Id,
        override_action: ActionType,
    ) -> Result<(), Error> {
        if owner_id == self.user_id || override_action.authenticate(self) {
            Ok(())
        } else {
            Err(Error::Unauthorized(String::from(
                "Only the author can modify this recipe",
            )))
        }
    }
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.to_owned(),
            role: user.role,
        }
    }
}
