//! Shared data models spanning the screening layers.

pub mod combination;
pub mod entity;
pub mod frame;
pub mod kdata;

pub use combination::CombinationMode;
pub use entity::{AdjustType, Entity, EntityId, EntityType};
pub use frame::{Column, Frame, ResultFrame, RowKey};
pub use kdata::{Kbar, LiquidityRecord};
