//! Ethernet station addresses
//!
//! Boot environments get their MAC from the device tree, an environment
//! variable (`ethaddr=02:00:5e:10:20:30`) or board EEPROM. [`MacAddress`]
//! parses and validates all of those the same way.

use core::fmt;
use core::str::FromStr;

/// 48-bit MAC address
///
/// Displayed as `XX:XX:XX:XX:XX:XX`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub const fn broadcast() -> Self {
        Self([0xFF; 6])
    }

    pub const fn zero() -> Self {
        Self([0x00; 6])
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// Group bit (bit 0 of the first octet)
    pub fn is_multicast(&self) -> bool {
        (self.0[0] & 0x01) != 0
    }

    pub fn is_unicast(&self) -> bool {
        !self.is_multicast()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0x00; 6]
    }

    /// Locally administered bit (bit 1 of the first octet)
    pub fn is_local(&self) -> bool {
        (self.0[0] & 0x02) != 0
    }

    /// Usable as a station address: unicast and not all zeros.
    pub fn is_valid(&self) -> bool {
        self.is_unicast() && !self.is_zero()
    }

    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseMacError;

impl fmt::Display for ParseMacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid MAC address")
    }
}

/// Six hex octets separated by `:` or `-`.
impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split([':', '-']);

        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or(ParseMacError)?;
            if part.is_empty() || part.len() > 2 {
                return Err(ParseMacError);
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| ParseMacError)?;
        }

        if parts.next().is_some() {
            return Err(ParseMacError);
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_mac_address_classes() {
        assert!(MacAddress::broadcast().is_broadcast());
        assert!(MacAddress::broadcast().is_multicast());
        assert!(MacAddress::zero().is_zero());
        assert!(!MacAddress::zero().is_valid());

        let mac = MacAddress::new([0x02, 0x00, 0x5E, 0x10, 0x20, 0x30]);
        assert!(mac.is_unicast());
        assert!(mac.is_local());
        assert!(mac.is_valid());

        let multicast = MacAddress::new([0x01, 0x00, 0x5E, 0x00, 0x00, 0x01]);
        assert!(!multicast.is_valid());
    }

    #[test]
    fn test_mac_address_display() {
        let mac = MacAddress::new([0xB8, 0x27, 0xEB, 0x12, 0x34, 0x56]);
        assert_eq!(mac.to_string(), "B8:27:EB:12:34:56");
    }

    #[test]
    fn test_mac_address_from_str() {
        let expected = MacAddress::new([0x02, 0x00, 0x5E, 0x10, 0x20, 0x30]);
        assert_eq!("02:00:5e:10:20:30".parse(), Ok(expected));
        assert_eq!("02-00-5E-10-20-30".parse(), Ok(expected));
        assert_eq!("2:0:5e:10:20:30".parse(), Ok(expected));

        assert_eq!("02:00:5e:10:20".parse::<MacAddress>(), Err(ParseMacError));
        assert_eq!("02:00:5e:10:20:30:40".parse::<MacAddress>(), Err(ParseMacError));
        assert_eq!("02:00:5e:10:20:3g".parse::<MacAddress>(), Err(ParseMacError));
        assert_eq!("02::5e:10:20:30".parse::<MacAddress>(), Err(ParseMacError));
        assert_eq!("002:00:5e:10:20:30".parse::<MacAddress>(), Err(ParseMacError));
    }
}
