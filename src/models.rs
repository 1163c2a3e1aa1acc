use chrono::NaiveDate;
use rusqlite::types::Value;

use crate::changeset::ChangeSet;

pub const SUPPLIERS: &str = "suppliers";
pub const SUPPLIER_DETAILS: &str = "supplier_details";
pub const BANK_ACCOUNT_DETAILS: &str = "bank_account_details";

/// Partial update for a row of `suppliers`. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplierPatch {
    pub id: i64,
    pub entity: Option<String>,
    pub company_name: Option<String>,
    pub alternate_company_name: Option<String>,
    pub city: Option<String>,
    pub location_region: Option<String>,
    pub legal_person: Option<String>,
    pub legal_person_id: Option<String>,
    pub number_of_employees_range_id: Option<i64>,
    pub passed_vetting: Option<String>,
    pub vetting_info_url: Option<String>,
    pub contact_person: Option<String>,
    pub contact_number: Option<String>,
    pub social_network_id: Option<String>,
}

impl SupplierPatch {
    pub fn changes(&self) -> ChangeSet {
        let mut c = ChangeSet::new();
        c.set_opt("entity", self.entity.clone());
        c.set_opt("company_name", self.company_name.clone());
        c.set_opt("alternate_company_name", self.alternate_company_name.clone());
        c.set_opt("city", self.city.clone());
        c.set_opt("location_region", self.location_region.clone());
        c.set_opt("legal_person", self.legal_person.clone());
        c.set_opt("legal_person_id", self.legal_person_id.clone());
        c.set_opt("number_of_employees_range_id", self.number_of_employees_range_id);
        c.set_opt("passed_vetting", self.passed_vetting.clone());
        c.set_opt("vetting_info_url", self.vetting_info_url.clone());
        c.set_opt("contact_person", self.contact_person.clone());
        c.set_opt("contact_number", self.contact_number.clone());
        c.set_opt("social_network_id", self.social_network_id.clone());
        c
    }
}

/// Partial update for the `supplier_details` row owned by a supplier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplierDetailPatch {
    pub supplier_id: i64,
    pub business_registration_number: Option<String>,
    pub registered_business_address: Option<String>,
    pub supplier_address: Option<String>,
    pub date_of_establishment: Option<NaiveDate>,
    pub paid_up_capital: Option<i64>,
    pub email_address: Option<String>,
    pub supplier_website_url: Option<String>,
    pub supplier_type: Option<String>,
    pub branded_goods: Option<i16>,
    pub brand_check_id: Option<String>,
    pub origin_source: Option<String>,
    pub honest_civil_debtor: Option<Flag>,
    pub invoice_under_alias: Option<Flag>,
}

impl SupplierDetailPatch {
    pub fn changes(&self) -> ChangeSet {
        let mut c = ChangeSet::new();
        c.set_opt("business_registration_number", self.business_registration_number.clone());
        c.set_opt("registered_business_address", self.registered_business_address.clone());
        c.set_opt("supplier_address", self.supplier_address.clone());
        c.set_opt(
            "date_of_establishment",
            self.date_of_establishment.map(|d| d.format("%Y-%m-%d").to_string()),
        );
        c.set_opt("paid_up_capital", self.paid_up_capital);
        c.set_opt("email_address", self.email_address.clone());
        c.set_opt("supplier_website_url", self.supplier_website_url.clone());
        c.set_opt("supplier_type", self.supplier_type.clone());
        c.set_opt("branded_goods", self.branded_goods);
        c.set_opt("brand_check_id", self.brand_check_id.clone());
        c.set_opt("origin_source", self.origin_source.clone());
        c.set_opt("honest_civil_debtor", self.honest_civil_debtor);
        c.set_opt("invoice_under_alias", self.invoice_under_alias);
        c
    }
}

/// Bank account fields for a supplier. Used both as a partial update built
/// from a row and as the snapshot of a stored record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankAccountPatch {
    pub supplier_id: i64,
    pub account_type: Option<String>,
    pub account_holder_name: Option<String>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub swift_code: Option<String>,
    pub bank_address: Option<String>,
    pub supplier_company_address: Option<String>,
}

impl BankAccountPatch {
    pub fn changes(&self) -> ChangeSet {
        let mut c = ChangeSet::new();
        c.set_opt("account_type", self.account_type.clone());
        c.set_opt("account_holder_name", self.account_holder_name.clone());
        c.set_opt("account_number", self.account_number.clone());
        c.set_opt("bank_name", self.bank_name.clone());
        c.set_opt("swift_code", self.swift_code.clone());
        c.set_opt("bank_address", self.bank_address.clone());
        c.set_opt("supplier_company_address", self.supplier_company_address.clone());
        c
    }

    /// This patch laid over `stored`: fields set here win, the rest keep the
    /// stored value.
    pub fn overlay(&self, stored: &BankAccountPatch) -> BankAccountPatch {
        fn pick(new: &Option<String>, old: &Option<String>) -> Option<String> {
            new.clone().or_else(|| old.clone())
        }
        BankAccountPatch {
            supplier_id: self.supplier_id,
            account_type: pick(&self.account_type, &stored.account_type),
            account_holder_name: pick(&self.account_holder_name, &stored.account_holder_name),
            account_number: pick(&self.account_number, &stored.account_number),
            bank_name: pick(&self.bank_name, &stored.bank_name),
            swift_code: pick(&self.swift_code, &stored.swift_code),
            bank_address: pick(&self.bank_address, &stored.bank_address),
            supplier_company_address: pick(
                &self.supplier_company_address,
                &stored.supplier_company_address,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Employee count brackets
// ---------------------------------------------------------------------------

/// (id, label). Ids are stable and referenced by `suppliers.number_of_employees_range_id`.
pub const EMPLOYEE_BRACKETS: &[(i64, &str)] = &[
    (1, "<50"),
    (2, "50-99"),
    (3, "100-499"),
    (4, "500-999"),
    (5, "1000-4999"),
    (6, ">=5000"),
];

/// Look up the bracket id for a label. Unknown labels map to 0, which callers
/// treat as unset.
pub fn employee_range_id(label: &str) -> i64 {
    let label = label.trim();
    EMPLOYEE_BRACKETS
        .iter()
        .find(|(_, l)| *l == label)
        .map(|(id, _)| *id)
        .unwrap_or(0)
}

/// A yes/no spreadsheet cell. Any other non-blank text is `Unset` and is
/// written as NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Yes,
    No,
    Unset,
}

impl Flag {
    pub fn parse(raw: &str) -> Flag {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("yes") {
            Flag::Yes
        } else if raw.eq_ignore_ascii_case("no") {
            Flag::No
        } else {
            Flag::Unset
        }
    }
}

impl From<Flag> for Value {
    fn from(flag: Flag) -> Value {
        match flag {
            Flag::Yes => Value::Integer(1),
            Flag::No => Value::Integer(0),
            Flag::Unset => Value::Null,
        }
    }
}
