use serde::{Deserialize, Serialize};

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// A user that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Deterministic synthetic user for row `index` of a benchmark table.
    pub fn synthetic(index: u64) -> Self {
        Self {
            name: format!("User {index}"),
            email: format!("user{index}@example.com"),
        }
    }

    pub fn with_id(self, id: i64) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NewUser;

    #[test]
    fn synthetic_rows_are_distinguishable() {
        let first = NewUser::synthetic(0);
        assert_eq!(first.name, "User 0");
        assert_eq!(first.email, "user0@example.com");

        let later = NewUser::synthetic(999_999);
        assert_eq!(later.name, "User 999999");
        assert_eq!(later.email, "user999999@example.com");
    }

    #[test]
    fn with_id_keeps_fields() {
        let user = NewUser::new("Ana", "ana@mail.com").with_id(3);
        assert_eq!(user.id, 3);
        assert_eq!(user.name, "Ana");
        assert_eq!(user.email, "ana@mail.com");
    }
}
