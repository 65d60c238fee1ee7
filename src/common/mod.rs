//! Small numeric helpers shared by indicators

pub mod math;
