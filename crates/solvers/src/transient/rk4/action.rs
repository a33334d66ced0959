/// Control actions supported by the RK4 integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop integrating and return the trajectory computed so far.
    StopEarly,
}
