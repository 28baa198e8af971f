use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{CustomerId, DomainError, DomainResult, Entity, SupplierId};

use crate::product::{optional, required};

/// Contact information shared by suppliers and customers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactInfo {
    fn normalized(self) -> DomainResult<Self> {
        let email = optional(self.email);
        if let Some(email) = email.as_deref() {
            validate_email(email)?;
        }
        Ok(Self {
            email,
            phone: optional(self.phone),
            address: optional(self.address),
        })
    }
}

fn validate_email(email: &str) -> DomainResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => Ok(()),
        _ => Err(DomainError::validation(format!("invalid email address: {email}"))),
    }
}

/// Supplier master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_person: Option<String>,
    pub contact: ContactInfo,
    pub created_at: DateTime<Utc>,
}

impl Entity for Supplier {
    type Id = SupplierId;

    const KIND: &'static str = "supplier";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Customer master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub contact: ContactInfo,
    pub created_at: DateTime<Utc>,
}

impl Entity for Customer {
    type Id = CustomerId;

    const KIND: &'static str = "customer";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSupplier {
    pub name: String,
    pub contact_person: Option<String>,
    pub contact: ContactInfo,
}

impl NewSupplier {
    pub(crate) fn into_supplier(self, id: SupplierId, now: DateTime<Utc>) -> DomainResult<Supplier> {
        Ok(Supplier {
            id,
            name: required("name", &self.name)?,
            contact_person: optional(self.contact_person),
            contact: self.contact.normalized()?,
            created_at: now,
        })
    }
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub contact: Option<ContactInfo>,
}

impl SupplierUpdate {
    pub(crate) fn apply_to(self, supplier: &Supplier) -> DomainResult<Supplier> {
        let mut next = supplier.clone();
        if let Some(name) = self.name {
            next.name = required("name", &name)?;
        }
        if let Some(person) = self.contact_person {
            next.contact_person = optional(Some(person));
        }
        if let Some(contact) = self.contact {
            next.contact = contact.normalized()?;
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub contact: ContactInfo,
}

impl NewCustomer {
    pub(crate) fn into_customer(self, id: CustomerId, now: DateTime<Utc>) -> DomainResult<Customer> {
        Ok(Customer {
            id,
            name: required("name", &self.name)?,
            contact: self.contact.normalized()?,
            created_at: now,
        })
    }
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub contact: Option<ContactInfo>,
}

impl CustomerUpdate {
    pub(crate) fn apply_to(self, customer: &Customer) -> DomainResult<Customer> {
        let mut next = customer.clone();
        if let Some(name) = self.name {
            next.name = required("name", &name)?;
        }
        if let Some(contact) = self.contact {
            next.contact = contact.normalized()?;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_contact_is_normalized() {
        let supplier = NewSupplier {
            name: "TechGiant Wholesale".to_string(),
            contact_person: Some("  ".to_string()),
            contact: ContactInfo {
                email: Some(" sales@techgiant.com ".to_string()),
                phone: Some("555-0101".to_string()),
                address: None,
            },
        }
        .into_supplier(SupplierId::new(), Utc::now())
        .unwrap();

        assert_eq!(supplier.contact_person, None);
        assert_eq!(supplier.contact.email.as_deref(), Some("sales@techgiant.com"));
    }

    #[test]
    fn malformed_email_is_rejected() {
        let err = NewCustomer {
            name: "Acme Corp".to_string(),
            contact: ContactInfo {
                email: Some("purchasing.acme.com".to_string()),
                ..ContactInfo::default()
            },
        }
        .into_customer(CustomerId::new(), Utc::now())
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn customer_update_rejects_blank_name() {
        let customer = NewCustomer {
            name: "Initech".to_string(),
            contact: ContactInfo::default(),
        }
        .into_customer(CustomerId::new(), Utc::now())
        .unwrap();

        let err = CustomerUpdate {
            name: Some(" ".to_string()),
            contact: None,
        }
        .apply_to(&customer)
        .unwrap_err();

        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }
}
