pub mod device;
pub mod keystore_store;
pub mod logging;

pub use device::{DeviceApp, DeviceSignResponse, HardwareDevice, HardwareEnumerator, MockDevice};
pub use keystore_store::{FileKeystoreStore, KeystoreStore, MemoryKeystoreStore};
