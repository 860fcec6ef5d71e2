/// Row timestamp format shared by the store and the event stream.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local capture time, formatted for the store.
pub fn current_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Placeholder written when a listing exposes no phone number.
pub const PHONE_UNKNOWN: &str = "N/A";

/// Placeholder written when the detail panel exposes no readable name.
pub const NAME_UNKNOWN: &str = "Unknown";

/// One validated lead, as persisted: a business with no discoverable
/// website. Never mutated after capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub name: String,
    pub phone: String,
    /// The niche+location query that produced this lead.
    pub query: String,
    pub captured_at: String,
}

impl Lead {
    pub fn new(name: String, phone: String, query: String, captured_at: String) -> Self {
        let phone = match phone.trim() {
            "" => PHONE_UNKNOWN.to_string(),
            p => p.to_string(),
        };
        Lead {
            name,
            phone,
            query,
            captured_at,
        }
    }

    /// Deduplication key: the phone number when one is known, otherwise the
    /// business name.
    pub fn identity_key(&self) -> &str {
        identity_key(&self.name, &self.phone)
    }
}

pub fn identity_key<'a>(name: &'a str, phone: &'a str) -> &'a str {
    if phone.is_empty() || phone == PHONE_UNKNOWN {
        name
    } else {
        phone
    }
}
