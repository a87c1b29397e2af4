//! Mapping a resolved address onto the address form

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::types::{AddressSource, ResolvedAddress};

/// The address part of the form being filled
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressForm {
    pub address_line: String,
    pub subdistrict: String,
    pub district: String,
    pub province: String,
    pub postal_code: String,
    /// All non-empty parts joined with spaces
    pub full_address: String,
    pub filled_from_location: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_source: Option<AddressSource>,
}

/// Form handle shared between the workflow and whoever renders the form
pub type SharedForm = Arc<RwLock<AddressForm>>;

/// One complete replacement of the form's address fields
#[derive(Debug, Clone, PartialEq)]
pub struct FormUpdate {
    pub address_line: String,
    pub subdistrict: String,
    pub district: String,
    pub province: String,
    pub postal_code: String,
    pub full_address: String,
    pub source: AddressSource,
}

impl FormUpdate {
    pub fn from_address(address: &ResolvedAddress) -> Self {
        let parts = [
            &address.address_line,
            &address.subdistrict,
            &address.district,
            &address.province,
            &address.postal_code,
        ];
        let full_address = parts
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            address_line: address.address_line.trim().to_string(),
            subdistrict: address.subdistrict.trim().to_string(),
            district: address.district.trim().to_string(),
            province: address.province.trim().to_string(),
            postal_code: address.postal_code.trim().to_string(),
            full_address,
            source: address.source_service,
        }
    }
}

impl AddressForm {
    pub fn apply(&mut self, update: FormUpdate) {
        self.address_line = update.address_line;
        self.subdistrict = update.subdistrict;
        self.district = update.district;
        self.province = update.province;
        self.postal_code = update.postal_code;
        self.full_address = update.full_address;
        self.address_source = Some(update.source);
        self.filled_from_location = true;
    }
}

pub fn shared_form() -> SharedForm {
    Arc::new(RwLock::new(AddressForm::default()))
}

/// Write `address` into the shared form in a single update
pub async fn fill(form: &SharedForm, address: &ResolvedAddress) -> FormUpdate {
    let update = FormUpdate::from_address(address);
    form.write().await.apply(update.clone());
    update
}
