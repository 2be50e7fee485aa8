mod calculus;
mod newton;
