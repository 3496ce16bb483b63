//! Bidirectional IP ↔ device index
//!
//! The [`MappingIndex`] keeps two views of the same assignments:
//!
//! - **forward**: IP address → device name (keys unique)
//! - **reverse**: device name → IP addresses in assignment order
//!
//! ## Invariants
//!
//! - Every `(ip, device)` in the forward map has `ip` listed under `device`
//!   in the reverse map, and nowhere else.
//! - An IP belongs to at most one device. Assigning it to a different
//!   device is rejected; the existing owner is never overwritten.
//!
//! The index is plain data with no interior mutability. Only the store actor
//! holds a live instance, so `&mut self` on [`MappingIndex::assign`] is the
//! whole synchronization story.

use std::collections::BTreeMap;

use crate::error::{DecodeError, Error, Result};

/// Outcome of a successful [`MappingIndex::assign`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// New mapping inserted
    Created,
    /// IP was already assigned to this device; nothing changed
    Unchanged,
}

/// In-memory forward and reverse maps of IP assignments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingIndex {
    ip_to_device: BTreeMap<String, String>,
    device_to_ips: BTreeMap<String, Vec<String>>,
}

impl MappingIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from `(ip, device)` pairs
    ///
    /// Pairs are applied in order through [`MappingIndex::assign`], so a
    /// later pair that conflicts with an earlier one is an error.
    pub fn from_pairs<I, S, D>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        let mut index = Self::new();
        for (ip, device) in pairs {
            index.assign(ip, device)?;
        }
        Ok(index)
    }

    /// Rebuild an index from its two maps, checking they agree
    ///
    /// Rejects input where a forward entry is missing from the reverse map,
    /// or where the reverse map lists an IP under a device it does not
    /// belong to. Duplicate entries in a reverse list are collapsed.
    pub fn from_parts(
        ip_to_device: BTreeMap<String, String>,
        device_to_ips: BTreeMap<String, Vec<String>>,
    ) -> std::result::Result<Self, DecodeError> {
        let mut reverse: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (device, ips) in device_to_ips {
            let mut listed = Vec::with_capacity(ips.len());
            for ip in ips {
                match ip_to_device.get(&ip) {
                    Some(owner) if *owner == device => {
                        if !listed.contains(&ip) {
                            listed.push(ip);
                        }
                    }
                    Some(owner) => {
                        return Err(DecodeError::Inconsistent(format!(
                            "{} listed under {} but mapped to {}",
                            ip, device, owner
                        )));
                    }
                    None => {
                        return Err(DecodeError::Inconsistent(format!(
                            "{} listed under {} but has no forward entry",
                            ip, device
                        )));
                    }
                }
            }
            if !listed.is_empty() {
                reverse.insert(device, listed);
            }
        }

        for (ip, device) in &ip_to_device {
            let present = reverse.get(device).is_some_and(|ips| ips.contains(ip));
            if !present {
                return Err(DecodeError::Inconsistent(format!(
                    "{} mapped to {} but missing from reverse index",
                    ip, device
                )));
            }
        }

        Ok(Self {
            ip_to_device,
            device_to_ips: reverse,
        })
    }

    /// Device currently assigned to `ip`
    pub fn lookup(&self, ip: &str) -> Option<&str> {
        self.ip_to_device.get(ip).map(String::as_str)
    }

    /// Assign `ip` to `device`
    ///
    /// - `ip` owned by another device → [`Error::IpInUse`], index untouched
    /// - `ip` already owned by `device` → [`Assignment::Unchanged`]; the
    ///   reverse list is not extended a second time
    /// - otherwise the mapping is inserted and `ip` is appended to the
    ///   device's list → [`Assignment::Created`]
    pub fn assign(&mut self, ip: impl Into<String>, device: impl Into<String>) -> Result<Assignment> {
        let ip = ip.into();
        let device = device.into();

        if let Some(current) = self.ip_to_device.get(&ip) {
            if *current != device {
                return Err(Error::ip_in_use(ip, current.clone()));
            }
            return Ok(Assignment::Unchanged);
        }

        self.device_to_ips
            .entry(device.clone())
            .or_default()
            .push(ip.clone());
        self.ip_to_device.insert(ip, device);

        Ok(Assignment::Created)
    }

    /// IPs assigned to `device`, in assignment order
    pub fn ips_for(&self, device: &str) -> &[String] {
        self.device_to_ips
            .get(device)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of assigned IPs
    pub fn len(&self) -> usize {
        self.ip_to_device.len()
    }

    /// Check if nothing is assigned
    pub fn is_empty(&self) -> bool {
        self.ip_to_device.is_empty()
    }

    /// Number of devices holding at least one IP
    pub fn device_count(&self) -> usize {
        self.device_to_ips.len()
    }

    /// Iterate over `(ip, device)` pairs in IP string order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ip_to_device
            .iter()
            .map(|(ip, device)| (ip.as_str(), device.as_str()))
    }

    pub(crate) fn forward(&self) -> &BTreeMap<String, String> {
        &self.ip_to_device
    }

    pub(crate) fn reverse(&self) -> &BTreeMap<String, Vec<String>> {
        &self.device_to_ips
    }
}
