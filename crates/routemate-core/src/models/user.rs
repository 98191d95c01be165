use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum password length accepted by the server
const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        match (&self.firstname, &self.lastname) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.username.clone(),
        }
    }
}

/// Sign-up form, serialized with the field names the server expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "login")]
    pub username: String,
    #[serde(rename = "code")]
    pub password: String,
    #[serde(rename = "mail")]
    pub email: String,
    #[serde(rename = "name")]
    pub firstname: String,
    #[serde(rename = "surname")]
    pub lastname: String,
}

impl Registration {
    /// Apply the server's validation rules locally, returning the first violation
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            (&self.username, "Username is required"),
            (&self.password, "Password is required"),
            (&self.email, "Email is required"),
            (&self.firstname, "FirstName is required"),
            (&self.lastname, "LastName is required"),
        ];
        if let Some((_, message)) = required.iter().find(|(value, _)| value.trim().is_empty()) {
            return Err(message.to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ));
        }
        let email_ok = self
            .email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
            .unwrap_or(false);
        if !email_ok {
            return Err("Invalid email format".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            username: "alice".to_string(),
            password: "correct-horse".to_string(),
            email: "alice@example.com".to_string(),
            firstname: "Alice".to_string(),
            lastname: "Liddell".to_string(),
        }
    }

    #[test]
    fn test_registration_wire_names() {
        let value = serde_json::to_value(registration()).unwrap();
        assert_eq!(value["login"], "alice");
        assert_eq!(value["code"], "correct-horse");
        assert_eq!(value["mail"], "alice@example.com");
        assert_eq!(value["name"], "Alice");
        assert_eq!(value["surname"], "Liddell");
    }

    #[test]
    fn test_registration_validation() {
        assert!(registration().validate().is_ok());

        let mut blank = registration();
        blank.lastname = "  ".to_string();
        assert_eq!(blank.validate().unwrap_err(), "LastName is required");

        let mut short = registration();
        short.password = "short".to_string();
        assert!(short.validate().unwrap_err().contains("at least 8"));

        let mut bad_email = registration();
        bad_email.email = "alice.example.com".to_string();
        assert_eq!(bad_email.validate().unwrap_err(), "Invalid email format");
    }

    #[test]
    fn test_full_name_falls_back_to_username() {
        let user: User = serde_json::from_str(
            r#"{"id":"22b210e3-d325-41be-b761-31e18bfe2c73","username":"alice","email":null,"firstname":null,"lastname":null}"#,
        )
        .unwrap();
        assert_eq!(user.full_name(), "alice");
    }
}
