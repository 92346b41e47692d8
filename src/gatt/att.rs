//! ATT error codes.

/// Human readable reason of an ATT error code, used in logs and in
/// [`crate::GattError::RequestFailed`].
pub fn ecode_to_str(status: u8) -> &'static str {
    match status {
        0x01 => "Invalid handle",
        0x02 => "Attribute can't be read",
        0x03 => "Attribute can't be written",
        0x04 => "Attribute PDU was invalid",
        0x05 => "Attribute requires authentication before read/write",
        0x06 => "Server doesn't support the request received",
        0x07 => "Offset past the end of the attribute",
        0x08 => "Attribute requires authorization before read/write",
        0x09 => "Too many prepare writes have been queued",
        0x0A => "No attribute found within the given range",
        0x0B => "Attribute can't be read/written using Read Blob Req",
        0x0C => "Encryption Key Size is insufficient",
        0x0D => "Attribute value length is invalid",
        0x0E => "Request attribute has encountered an unlikely error",
        0x0F => "Encryption required before read/write",
        0x10 => "Attribute type is not a supported grouping attribute",
        0x11 => "Insufficient Resources to complete the request",
        _ => "Unexpected error code",
    }
}

/// `Attribute Not Found`, what a server answers once a discovery walked past
/// the last matching attribute.
pub const ATT_ECODE_ATTR_NOT_FOUND: u8 = 0x0A;
