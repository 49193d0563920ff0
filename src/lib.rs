#[allow(non_snake_case)]
pub mod BatchReactor;
#[allow(non_snake_case)]
pub mod Flowsheet;
#[allow(non_snake_case)]
pub mod Reactions;
#[allow(non_snake_case)]
pub mod Streams;
#[allow(non_snake_case)]
pub mod TEA;
#[allow(non_snake_case)]
pub mod Units;
pub mod scenarios;
