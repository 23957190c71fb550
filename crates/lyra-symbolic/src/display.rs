//! Human-readable rendering of expressions.

use std::fmt;

use symbolica::atom::AtomCore;
use symbolica::printer::PrintOptions;

use crate::expr::{Expr, Function, Symbol};

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.printer(PrintOptions::file_no_namespace()))
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::on_engine_thread;

    #[test]
    fn test_display_hides_namespaces() {
        on_engine_thread(|| {
            let x = Expr::sym("x");
            assert_eq!(x.to_string(), "x");
            assert_eq!(x.sin().to_string(), "sin(x)");
            assert_eq!(Expr::apply("phi", [x.clone()]).to_string(), "phi(x)");
            assert_eq!(Expr::rational(-3, 4).to_string(), "-3/4");
        });
    }

    #[test]
    fn test_debug_wraps_display() {
        on_engine_thread(|| {
            let r = Expr::sym("r");
            assert_eq!(format!("{:?}", r), "Expr(r)");
            assert_eq!(Symbol::new("theta").to_string(), "theta");
        });
    }
}
