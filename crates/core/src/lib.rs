// usecase::mocks は単体テストと統合テストの両方から `ib_core::` パスでコンパイルされる
#[cfg(test)]
extern crate self as ib_core;

pub mod domain;
pub mod infra;
pub mod usecase;
