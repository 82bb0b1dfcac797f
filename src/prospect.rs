use serde::{Deserialize, Serialize};

use crate::funnel::ProspectId;

/// What we know about the prospect before the first message goes out
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProspectProfile {
    /// Explicit identifier; derived from the name when unset
    pub id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub role: String,
    pub industry: String,
    /// How often they talk to salespeople ("occasionally", "rarely", ...)
    pub communication_frequency: String,
    pub category: String,
    pub country: String,
}

impl Default for ProspectProfile {
    fn default() -> Self {
        Self {
            id: None,
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            company: "Apple".to_string(),
            role: "CTO".to_string(),
            industry: "Technology".to_string(),
            communication_frequency: "occasionally".to_string(),
            category: "Entrepreneur".to_string(),
            country: "United States".to_string(),
        }
    }
}

impl ProspectProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// `PROSPECT_JOHN_DOE` style id unless one was configured
    pub fn prospect_id(&self) -> ProspectId {
        match &self.id {
            Some(id) if !id.trim().is_empty() => ProspectId::new(id.trim()),
            _ => {
                let slug: String = format!("{}_{}", self.first_name, self.last_name)
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
                    .collect();
                ProspectId::new(format!("PROSPECT_{slug}"))
            }
        }
    }

    /// Natural-language description handed to the drafting and classification models
    pub fn describe(&self) -> String {
        format!(
            "You are reaching out to {first} {last}, who is the {role} at {company} (a {industry} company). \
             {first} is an {category} based in {country} who communicates with salesmen {frequency}. \
             When crafting messages, consider their seniority level ({role}) and communication style.",
            first = self.first_name,
            last = self.last_name,
            role = self.role,
            company = self.company,
            industry = self.industry,
            category = self.category,
            country = self.country,
            frequency = self.communication_frequency,
        )
    }
}
