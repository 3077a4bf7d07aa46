pub(super) mod common;

mod intake;
mod routing;
