//! Turns one spreadsheet row into partial updates for the three supplier
//! tables. Cells are positional; a blank cell never produces a write.

use tracing::debug;

use crate::error::{Result, SyncError};
use crate::models::{employee_range_id, BankAccountPatch, Flag, SupplierDetailPatch, SupplierPatch};
use crate::validation::{parse_iso_date, validate_bank_account, validate_detail, validate_supplier, Violation};

/// Column offsets in the source sheet (0-based). Columns 24 and 28 are not
/// imported.
pub mod col {
    pub const SUPPLIER_ID: usize = 0;
    pub const ENTITY: usize = 1;
    pub const COMPANY_NAME: usize = 2;
    pub const ALTERNATE_COMPANY_NAME: usize = 3;
    pub const BUSINESS_REGISTRATION_NUMBER: usize = 4;
    pub const REGISTERED_BUSINESS_ADDRESS: usize = 5;
    pub const SUPPLIER_ADDRESS: usize = 6;
    pub const DATE_OF_ESTABLISHMENT: usize = 7;
    pub const CITY: usize = 8;
    pub const LOCATION_REGION: usize = 9;
    pub const LEGAL_PERSON: usize = 10;
    pub const LEGAL_PERSON_ID: usize = 11;
    pub const PAID_UP_CAPITAL: usize = 12;
    pub const EMPLOYEE_BRACKET: usize = 13;
    pub const PASSED_VETTING: usize = 14;
    pub const VETTING_INFO_URL: usize = 15;
    pub const CONTACT_PERSON: usize = 16;
    pub const CONTACT_NUMBER: usize = 17;
    pub const SOCIAL_NETWORK_ID: usize = 18;
    pub const EMAIL_ADDRESS: usize = 19;
    pub const SUPPLIER_WEBSITE_URL: usize = 20;
    pub const SUPPLIER_TYPE: usize = 21;
    pub const BRANDED_GOODS: usize = 22;
    pub const BRAND_CHECK_ID: usize = 23;
    pub const ORIGIN_SOURCE: usize = 25;
    pub const HONEST_CIVIL_DEBTOR: usize = 26;
    pub const INVOICE_UNDER_ALIAS: usize = 27;
    pub const ACCOUNT_TYPE: usize = 29;
    pub const ACCOUNT_HOLDER_NAME: usize = 30;
    pub const ACCOUNT_NUMBER: usize = 31;
    pub const BANK_NAME: usize = 32;
    pub const SWIFT_CODE: usize = 33;
    pub const BANK_ADDRESS: usize = 34;
    pub const SUPPLIER_COMPANY_ADDRESS: usize = 35;

    /// Width of a complete row.
    pub const WIDTH: usize = 36;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub supplier: SupplierPatch,
    pub detail: SupplierDetailPatch,
    pub bank: BankAccountPatch,
}

impl MappedRow {
    pub fn supplier_id(&self) -> i64 {
        self.supplier.id
    }

    pub fn has_bank_fields(&self) -> bool {
        !self.bank.changes().is_empty()
    }

    /// Violations across all three records. `stored_bank` is the live bank
    /// account, if any, so the required-together group sees the final state.
    pub fn validate(&self, stored_bank: Option<&BankAccountPatch>) -> Vec<Violation> {
        let mut out = validate_supplier(&self.supplier);
        out.extend(validate_detail(&self.detail));
        out.extend(validate_bank_account(&self.bank, stored_bank));
        out
    }
}

/// Trimmed cell at `idx`, or `None` when blank or past the end of the row.
fn cell<S: AsRef<str>>(row: &[S], idx: usize) -> Option<&str> {
    row.get(idx)
        .map(|c| c.as_ref().trim())
        .filter(|c| !c.is_empty())
}

fn text<S: AsRef<str>>(row: &[S], idx: usize) -> Option<String> {
    cell(row, idx).map(str::to_string)
}

fn parsed<S, T>(row: &[S], idx: usize, field: &str) -> Option<T>
where
    S: AsRef<str>,
    T: std::str::FromStr,
{
    let raw = cell(row, idx)?;
    let value = raw.parse().ok();
    if value.is_none() {
        debug!(column = idx, field, value = raw, "skipping unparseable cell");
    }
    value
}

fn flag<S: AsRef<str>>(row: &[S], idx: usize, field: &str) -> Option<Flag> {
    let raw = cell(row, idx)?;
    let flag = Flag::parse(raw);
    if flag == Flag::Unset {
        debug!(column = idx, field, value = raw, "not yes or no, clearing flag");
    }
    Some(flag)
}

pub fn parse_supplier_id<S: AsRef<str>>(row: &[S]) -> Result<i64> {
    let raw = cell(row, col::SUPPLIER_ID).ok_or(SyncError::MissingSupplierId)?;
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(SyncError::InvalidSupplierId(raw.to_string())),
    }
}

pub fn map_row<S: AsRef<str>>(row: &[S]) -> Result<MappedRow> {
    let id = parse_supplier_id(row)?;
    if row.len() < col::WIDTH {
        debug!(supplier_id = id, cells = row.len(), "short row, missing cells are blank");
    }

    let number_of_employees_range_id = cell(row, col::EMPLOYEE_BRACKET).and_then(|label| {
        match employee_range_id(label) {
            0 => {
                debug!(value = label, "unknown employee count bracket");
                None
            }
            id => Some(id),
        }
    });

    let supplier = SupplierPatch {
        id,
        entity: text(row, col::ENTITY),
        company_name: text(row, col::COMPANY_NAME),
        alternate_company_name: text(row, col::ALTERNATE_COMPANY_NAME),
        city: text(row, col::CITY),
        location_region: text(row, col::LOCATION_REGION),
        legal_person: text(row, col::LEGAL_PERSON),
        legal_person_id: text(row, col::LEGAL_PERSON_ID),
        number_of_employees_range_id,
        passed_vetting: text(row, col::PASSED_VETTING),
        vetting_info_url: text(row, col::VETTING_INFO_URL),
        contact_person: text(row, col::CONTACT_PERSON),
        contact_number: text(row, col::CONTACT_NUMBER),
        social_network_id: text(row, col::SOCIAL_NETWORK_ID),
    };

    let date_of_establishment = cell(row, col::DATE_OF_ESTABLISHMENT).and_then(|raw| {
        let date = parse_iso_date(raw);
        if date.is_none() {
            debug!(value = raw, "skipping unparseable date of establishment");
        }
        date
    });

    let detail = SupplierDetailPatch {
        supplier_id: id,
        business_registration_number: text(row, col::BUSINESS_REGISTRATION_NUMBER),
        registered_business_address: text(row, col::REGISTERED_BUSINESS_ADDRESS),
        supplier_address: text(row, col::SUPPLIER_ADDRESS),
        date_of_establishment,
        paid_up_capital: parsed(row, col::PAID_UP_CAPITAL, "paid_up_capital"),
        email_address: text(row, col::EMAIL_ADDRESS),
        supplier_website_url: text(row, col::SUPPLIER_WEBSITE_URL),
        supplier_type: text(row, col::SUPPLIER_TYPE),
        branded_goods: parsed(row, col::BRANDED_GOODS, "branded_goods"),
        brand_check_id: text(row, col::BRAND_CHECK_ID),
        origin_source: text(row, col::ORIGIN_SOURCE),
        honest_civil_debtor: flag(row, col::HONEST_CIVIL_DEBTOR, "honest_civil_debtor"),
        invoice_under_alias: flag(row, col::INVOICE_UNDER_ALIAS, "invoice_under_alias"),
    };

    let bank = BankAccountPatch {
        supplier_id: id,
        account_type: text(row, col::ACCOUNT_TYPE),
        account_holder_name: text(row, col::ACCOUNT_HOLDER_NAME),
        account_number: text(row, col::ACCOUNT_NUMBER),
        bank_name: text(row, col::BANK_NAME),
        swift_code: text(row, col::SWIFT_CODE),
        bank_address: text(row, col::BANK_ADDRESS),
        supplier_company_address: text(row, col::SUPPLIER_COMPANY_ADDRESS),
    };

    Ok(MappedRow { supplier, detail, bank })
}
