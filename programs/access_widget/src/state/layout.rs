//! Borsh helpers for fields the program stores as raw 32-byte keys.

use anchor_lang::prelude::Pubkey;
use borsh::io::{Read, Result, Write};
use borsh::{BorshDeserialize, BorshSerialize};

pub fn serialize_pubkey<W: Write>(key: &Pubkey, writer: &mut W) -> Result<()> {
    key.to_bytes().serialize(writer)
}

pub fn deserialize_pubkey<R: Read>(reader: &mut R) -> Result<Pubkey> {
    <[u8; 32]>::deserialize_reader(reader).map(Pubkey::new_from_array)
}

pub fn serialize_pubkeys<W: Write>(keys: &[Pubkey], writer: &mut W) -> Result<()> {
    let raw: Vec<[u8; 32]> = keys.iter().map(|key| key.to_bytes()).collect();
    raw.serialize(writer)
}

pub fn deserialize_pubkeys<R: Read>(reader: &mut R) -> Result<Vec<Pubkey>> {
    let raw = Vec::<[u8; 32]>::deserialize_reader(reader)?;
    Ok(raw.into_iter().map(Pubkey::new_from_array).collect())
}

/// Decode an account, tolerating trailing bytes (accounts may be over-allocated).
pub(crate) fn decode<T: BorshDeserialize>(account: &'static str, data: &[u8]) -> crate::Result<T> {
    let mut slice = data;
    T::deserialize(&mut slice).map_err(|e| crate::WidgetError::decode(account, e))
}
