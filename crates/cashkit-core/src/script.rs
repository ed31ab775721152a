//! The handful of standard scripts a single-key wallet needs.

pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;

/// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_locking_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_data(&mut script, pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// `OP_HASH160 <20> OP_EQUAL`
pub fn p2sh_locking_script(script_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.push(OP_HASH160);
    push_data(&mut script, script_hash);
    script.push(OP_EQUAL);
    script
}

/// Unlocking script `<sig+sighash> <pubkey>` for a P2PKH input.
pub fn p2pkh_unlocking_script(signature_with_hashtype: &[u8], public_key: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(2 + signature_with_hashtype.len() + public_key.len());
    push_data(&mut script, signature_with_hashtype);
    push_data(&mut script, public_key);
    script
}

/// Append a direct push of `data`. Only short pushes (< 76 bytes) occur here.
fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    debug_assert!(data.len() < 0x4c);
    script.push(data.len() as u8);
    script.extend_from_slice(data);
}

/// Extract the pubkey hash from a P2PKH locking script.
pub fn p2pkh_pubkey_hash(script: &[u8]) -> Option<[u8; 20]> {
    match script {
        [OP_DUP, OP_HASH160, 0x14, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] if hash.len() == 20 => {
            let mut out = [0u8; 20];
            out.copy_from_slice(hash);
            Some(out)
        }
        _ => None,
    }
}
