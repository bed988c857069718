//! Store profiles shipped with the service.

use super::StoreProfile;
use crate::extract::{RowScanSpec, SelectorSpec};

pub const LABEL_CURRENT_PRICE: &str = "precio_actual";
pub const LABEL_PREVIOUS_PRICE: &str = "precio_anterior";
pub const LABEL_SANITARY_REGISTRATION: &str = "registro_invima";

fn price_pair(current: &str, previous: &str) -> Vec<SelectorSpec> {
    vec![
        SelectorSpec::labeled(LABEL_CURRENT_PRICE, current),
        SelectorSpec::labeled(LABEL_PREVIOUS_PRICE, previous),
    ]
}

/// Built-in profiles in routing priority order.
pub fn builtin_profiles() -> Vec<StoreProfile> {
    vec![
        StoreProfile {
            token: "cruzverde.com.co".to_string(),
            name: "Cruz Verde".to_string(),
            selectors: price_pair("span.box__price--current", "span.box__price--old"),
            // Product specifications render client-side as unordered rows
            row_scan: Some(RowScanSpec {
                label: LABEL_SANITARY_REGISTRATION.to_string(),
                row_selector: "div.product-specifications div.specification-item".to_string(),
                header_selector: ".specification-item__name".to_string(),
                value_selector: ".specification-item__value".to_string(),
                header_match: "registro".to_string(),
            }),
        },
        StoreProfile {
            token: "farmatodo.com.co".to_string(),
            name: "Farmatodo".to_string(),
            selectors: price_pair("div.Price span.MuiTypography-root", "div.price_old"),
            row_scan: None,
        },
        StoreProfile {
            token: "droguerialaalemana.com".to_string(),
            name: "Droguería La Alemana".to_string(),
            selectors: price_pair("span.price", "span.old-price"),
            row_scan: None,
        },
    ]
}
