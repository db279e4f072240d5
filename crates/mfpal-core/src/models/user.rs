use serde::{Deserialize, Serialize};

/// Account-link domain that carries the food-tracking user id
pub const MFP_DOMAIN: &str = "MFP";

const CM_PER_INCH: f64 = 2.54;
const KG_PER_POUND: f64 = 0.453592;

/// Identity-service user record from `GET /users/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct User {
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(rename = "profileEmails", default)]
    pub profile_emails: ProfileEmails,
    #[serde(rename = "accountLinks", default)]
    pub account_links: Vec<AccountLink>,
}

impl User {
    /// Domain user id from the first linked MFP account
    pub fn domain_user_id(&self) -> Option<&str> {
        self.account_links
            .iter()
            .filter(|link| link.domain.as_deref() == Some(MFP_DOMAIN))
            .filter_map(|link| link.domain_user_id.as_deref())
            .find(|id| !id.is_empty())
    }

    pub fn primary_email(&self) -> Option<&str> {
        self.profile_emails.primary()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserProfile {
    #[serde(rename = "fullName", default)]
    pub full_name: Option<String>,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(rename = "profilePictureUri", default)]
    pub profile_picture_uri: Option<String>,
    #[serde(default)]
    pub birthdate: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Pounds
    #[serde(default)]
    pub weight: Option<f64>,
    /// Inches
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl UserProfile {
    pub fn height_in_cm(&self) -> Option<f64> {
        self.height.map(|inches| inches * CM_PER_INCH)
    }

    pub fn weight_in_kg(&self) -> Option<f64> {
        self.weight.map(|pounds| pounds * KG_PER_POUND)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Location {
    #[serde(rename = "postalCode", default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileEmails {
    #[serde(rename = "isEmailVerified", default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub emails: Vec<Email>,
}

impl ProfileEmails {
    /// First email flagged primary, falling back to the first one listed
    pub fn primary(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.primary)
            .or_else(|| self.emails.first())
            .map(|e| e.email.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub email: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLink {
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(rename = "domainUserId", default)]
    pub domain_user_id: Option<String>,
}
