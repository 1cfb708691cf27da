use std::fmt::{Debug, Formatter};

use derive_more::{Constructor, From};
use log::kv::{ToValue, Value};
use sha2::{Digest, Sha256};

use cert_authz_identity::Identity;

pub(crate) trait Obfuscate {
    fn obfuscate(&self, f: &mut Formatter<'_>) -> core::fmt::Result;
}

impl Obfuscate for &str {
    fn obfuscate(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(hex::encode(compute_hash(self.as_bytes())).as_str())
    }
}

impl Obfuscate for &String {
    fn obfuscate(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.as_str().obfuscate(f)
    }
}

impl Obfuscate for &Identity {
    fn obfuscate(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Identity(")?;
        self.id.as_str().obfuscate(f)?;
        write!(f, ")")
    }
}

#[derive(From, Constructor)]
pub(crate) struct Obfuscated<T>(T);

impl<T> Debug for Obfuscated<T>
where
    T: Obfuscate,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.0.obfuscate(f)
    }
}

impl<T> ToValue for Obfuscated<T>
where
    T: Obfuscate,
{
    fn to_value(&self) -> Value {
        Value::from_debug(self)
    }
}

fn compute_hash(bytes: &[u8]) -> [u8; 10] {
    let mut hasher = Sha256::new();
    let mut output = [0; 10];
    hasher.update(bytes);
    output.copy_from_slice(&hasher.finalize().as_slice()[0..10]);
    output
}
