//! Membership resolver
//!
//! Binds each device to at most one DAO. DAOs are scanned in ledger
//! enumeration order and the first member-list hit wins, so the output is
//! fully determined by the ordered inputs. A device whose account sits in
//! several member lists is silently bound to the first enumerated DAO;
//! that is marketplace policy, not an error.

use crate::model::{Dao, Device};

/// Assign `dao` on every device. Devices with no membership anywhere keep
/// `dao == None` and form the "available devices" subset.
pub fn resolve(daos: &[Dao], mut devices: Vec<Device>) -> Vec<Device> {
    for device in &mut devices {
        device.dao = daos
            .iter()
            .find(|dao| dao.is_member(&device.account))
            .map(|dao| dao.dao_name.clone());
    }
    devices
}
