pub(crate) mod bit_coder;
