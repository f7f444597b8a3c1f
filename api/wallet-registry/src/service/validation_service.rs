use crate::module::wallet::error::AppError;
use crate::module::wallet::schema::CreateWalletRequest;

/// Checks for `0x` followed by exactly 40 hex characters.
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex_part) = address.strip_prefix("0x") else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Returns the trimmed `(address, label)` pair once both are present
/// and the address is well-formed.
pub fn validate_create_request(req: &CreateWalletRequest) -> Result<(String, String), AppError> {
    let address = req.address.as_deref().unwrap_or("").trim().to_string();
    let label = req.label.as_deref().unwrap_or("").trim().to_string();
    if address.is_empty() || label.is_empty() {
        return Err(AppError::bad_request(
            "MISSING_FIELDS",
            "address and label are required",
        ));
    }
    if !is_valid_address(&address) {
        return Err(AppError::bad_request(
            "INVALID_ADDRESS",
            "address must be 0x followed by 40 hex characters",
        ));
    }
    Ok((address, label))
}
