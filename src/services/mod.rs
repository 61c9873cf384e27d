pub mod address;
pub mod notify;

pub use address::{AddressInput, AddressResolver, NominatimResolver, ResolvedAddress, ViaCepResolver};
pub use notify::{LogNotifier, Notifier, RsvpChange};
