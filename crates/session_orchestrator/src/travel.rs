//! Boundary to the external gameplay-map transition mechanism.

/// Invoked by the orchestrator after successful host/join outcomes. The
/// actual level load and connect are implemented outside this system.
pub trait TravelHandler: Send {
    /// Move the local game to the shared destination after hosting.
    fn open_destination(&mut self, destination: &str);

    /// Connect the local game to a resolved session address after joining.
    fn connect_to(&mut self, address: &str);
}
