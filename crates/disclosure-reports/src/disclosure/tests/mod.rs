mod common;
mod rendering;
