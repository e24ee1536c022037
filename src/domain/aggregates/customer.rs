//! Customer Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use crate::domain::events::{CustomerEvent, DomainEvent};
use crate::domain::services::tiering;
use crate::domain::value_objects::{Money, Phone};

/// Loyalty tier, labelled the way customers see it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CustomerTier {
    #[default]
    #[serde(rename = "Đồng")]
    Bronze,
    #[serde(rename = "Bạc")]
    Silver,
    #[serde(rename = "Vàng")]
    Gold,
    #[serde(rename = "Bạch Kim")]
    Platinum,
}

impl CustomerTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bronze => "Đồng",
            Self::Silver => "Bạc",
            Self::Gold => "Vàng",
            Self::Platinum => "Bạch Kim",
        }
    }
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for CustomerTier {
    type Err = CustomerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Bronze, Self::Silver, Self::Gold, Self::Platinum]
            .into_iter()
            .find(|t| t.label() == s)
            .ok_or_else(|| CustomerError::UnknownTier(s.to_string()))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Customer {
    customer_id: String,
    phone: Phone,
    full_name: String,
    email: Option<String>,
    #[serde(skip_serializing)]
    password_hash: String,
    password_version: u32,
    total_spent: Money,
    tier: CustomerTier,
    groups: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Persisted state used to rebuild a customer from storage.
#[derive(Clone, Debug)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub phone: Phone,
    pub full_name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub password_version: u32,
    pub total_spent: Money,
    pub tier: CustomerTier,
    pub groups: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn register(customer_id: impl Into<String>, phone: Phone, full_name: impl Into<String>, email: Option<String>, password_hash: String) -> Self {
        let now = Utc::now();
        let mut customer = Self::restore(CustomerRecord {
            customer_id: customer_id.into(), phone, full_name: full_name.into(), email, password_hash,
            password_version: 1, total_spent: Money::default(), tier: CustomerTier::Bronze,
            groups: vec![], created_at: now, updated_at: now,
        });
        customer.raise_event(DomainEvent::Customer(CustomerEvent::Registered { customer_id: customer.customer_id.clone() }));
        customer
    }

    pub fn restore(r: CustomerRecord) -> Self {
        Self {
            customer_id: r.customer_id, phone: r.phone, full_name: r.full_name, email: r.email,
            password_hash: r.password_hash, password_version: r.password_version, total_spent: r.total_spent,
            tier: r.tier, groups: r.groups, created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        }
    }

    pub fn customer_id(&self) -> &str { &self.customer_id }
    pub fn phone(&self) -> &Phone { &self.phone }
    pub fn full_name(&self) -> &str { &self.full_name }
    pub fn email(&self) -> Option<&str> { self.email.as_deref() }
    pub fn password_hash(&self) -> &str { &self.password_hash }
    pub fn password_version(&self) -> u32 { self.password_version }
    pub fn total_spent(&self) -> &Money { &self.total_spent }
    pub fn tier(&self) -> CustomerTier { self.tier }
    pub fn groups(&self) -> &[String] { &self.groups }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn change_password_hash(&mut self, new_hash: String) {
        self.password_hash = new_hash;
        self.password_version += 1;
        self.touch();
        self.raise_event(DomainEvent::Customer(CustomerEvent::PasswordChanged {
            customer_id: self.customer_id.clone(),
            password_version: self.password_version,
        }));
    }

    /// Records lifetime completed spend and re-derives the tier.
    /// Returns true when the tier changed.
    pub fn apply_lifetime_spend(&mut self, total: Money) -> bool {
        let tier = tiering::tier_for(&total);
        self.total_spent = total;
        self.touch();
        if tier == self.tier { return false; }
        let from = std::mem::replace(&mut self.tier, tier);
        self.raise_event(DomainEvent::Customer(CustomerEvent::TierChanged { customer_id: self.customer_id.clone(), from, to: tier }));
        true
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomerError {
    #[error("Unknown customer tier '{0}'")]
    UnknownTier(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn customer() -> Customer {
        Customer::register("KH001", Phone::parse("0901234567").unwrap(), "Tran Thi B", None, "hash".into())
    }

    #[test]
    fn test_password_change_bumps_version() {
        let mut c = customer();
        assert_eq!(c.password_version(), 1);
        c.change_password_hash("new".into());
        assert_eq!(c.password_version(), 2);
        assert_eq!(c.password_hash(), "new");
    }

    #[test]
    fn test_tier_follows_spend() {
        let mut c = customer();
        assert!(c.apply_lifetime_spend(Money::vnd(Decimal::new(6_000_000, 0))));
        assert_eq!(c.tier(), CustomerTier::Silver);
        assert!(!c.apply_lifetime_spend(Money::vnd(Decimal::new(7_000_000, 0))));
        assert_eq!(c.total_spent().amount(), Decimal::new(7_000_000, 0));
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!("Bạch Kim".parse::<CustomerTier>().unwrap(), CustomerTier::Platinum);
        assert_eq!(serde_json::to_string(&CustomerTier::Bronze).unwrap(), "\"Đồng\"");
        assert!("Diamond".parse::<CustomerTier>().is_err());
    }

    #[test]
    fn test_hash_is_never_serialized() {
        let json = serde_json::to_value(customer()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["tier"], "Đồng");
    }
}
