use fsgate_common::types::{FileInfo, Identity, PermissionBits};
use tracing::debug;

fn grants_read(bits: PermissionBits) -> bool {
    matches!(
        bits,
        PermissionBits::Read
            | PermissionBits::ReadWrite
            | PermissionBits::ReadExecute
            | PermissionBits::All
    )
}

fn grants_execute(bits: PermissionBits) -> bool {
    matches!(bits, PermissionBits::ReadExecute | PermissionBits::All)
}

fn evaluate(info: &FileInfo, identity: &Identity, grants: fn(PermissionBits) -> bool) -> bool {
    let perms = &info.permissions;
    if grants(perms.other) {
        return true;
    }
    if identity.user == info.owner && grants(perms.owner) {
        return true;
    }
    identity.is_member_of(&info.group) && grants(perms.group)
}

/// Whether `identity` may read the node, i.e. download it when it is a
/// file. `other` grants are honored regardless of identity, then the
/// owner bits, then the group bits.
pub fn can_read(info: &FileInfo, identity: &Identity) -> bool {
    let allowed = evaluate(info, identity, grants_read);
    if allowed {
        debug!(path = %info.path, "read allowed for current identity");
    }
    allowed
}

/// Whether `identity` may execute the node, i.e. list it or descend
/// into it when it is a directory.
pub fn can_execute(info: &FileInfo, identity: &Identity) -> bool {
    let allowed = evaluate(info, identity, grants_execute);
    if allowed {
        debug!(path = %info.path, "execute allowed for current identity");
    }
    allowed
}
