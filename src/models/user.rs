use serde::{Deserialize, Serialize};

use super::UserId;

/// A user of the ratings site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct User {
    /// Unique identifier for the user
    pub id: UserId,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub zipcode: Option<String>,
}

/// Profile fields supplied when registering a user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub zipcode: Option<String>,
}

impl NewUser {
    /// Assigns an id, producing the stored user
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            email: self.email,
            age: self.age,
            zipcode: self.zipcode,
        }
    }
}
