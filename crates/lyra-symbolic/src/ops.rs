//! Arithmetic operator overloads for [`Expr`].

use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use symbolica::atom::Atom;

use crate::expr::Expr;

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr(-self.0)
    }
}

impl Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr(-&self.0)
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr($imp::$method(self.0, rhs.0))
            }
        }

        impl $imp<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr($imp::$method(&self.0, &rhs.0))
            }
        }

        impl $imp<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr($imp::$method(self.0, &rhs.0))
            }
        }

        impl $imp<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr($imp::$method(&self.0, rhs.0))
            }
        }

        impl $imp<i64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: i64) -> Expr {
                Expr($imp::$method(self.0, rhs))
            }
        }

        impl $imp<i64> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: i64) -> Expr {
                Expr($imp::$method(&self.0, rhs))
            }
        }

        impl $imp<Expr> for i64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr($imp::$method(Atom::num(self), rhs.0))
            }
        }

        impl $imp<&Expr> for i64 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr($imp::$method(Atom::num(self), &rhs.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(Div, div);

impl AddAssign for Expr {
    fn add_assign(&mut self, rhs: Expr) {
        self.0 += rhs.0;
    }
}

impl AddAssign<&Expr> for Expr {
    fn add_assign(&mut self, rhs: &Expr) {
        self.0 += &rhs.0;
    }
}

impl SubAssign for Expr {
    fn sub_assign(&mut self, rhs: Expr) {
        self.0 -= rhs.0;
    }
}

impl MulAssign for Expr {
    fn mul_assign(&mut self, rhs: Expr) {
        self.0 *= rhs.0;
    }
}

impl Sum for Expr {
    fn sum<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        Expr::add_all(iter)
    }
}

impl<'a> Sum<&'a Expr> for Expr {
    fn sum<I: Iterator<Item = &'a Expr>>(iter: I) -> Expr {
        Expr::add_all(iter.cloned())
    }
}

impl Product for Expr {
    fn product<I: Iterator<Item = Expr>>(iter: I) -> Expr {
        Expr::mul_all(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::on_engine_thread;

    #[test]
    fn test_reference_operators() {
        on_engine_thread(|| {
            let x = Expr::sym("x");
            let y = Expr::sym("y");
            assert_eq!(&x + &y, x.clone() + y.clone());
            assert_eq!(&x * 2, 2 * &x);
            assert_eq!(&x / &x, Expr::one());
            assert_eq!(-(-&x), x);
            assert_eq!(1 - &x + &x, Expr::one());
        });
    }

    #[test]
    fn test_sum_and_product() {
        on_engine_thread(|| {
            let x = Expr::sym("x");
            let total: Expr = (1..=3).map(|k| Expr::int(k) * &x).sum();
            assert_eq!(total, 6 * &x);
            let prod: Expr = vec![x.clone(), x.clone(), Expr::int(3)].into_iter().product();
            assert_eq!(prod, 3 * x.powi(2));
        });
    }

    #[test]
    fn test_assign_operators() {
        on_engine_thread(|| {
            let x = Expr::sym("x");
            let mut acc = Expr::zero();
            acc += x.clone();
            acc += &x;
            acc -= Expr::int(1);
            acc *= Expr::int(2);
            assert_eq!(acc.simplify().unwrap(), 4 * &x - 2);
        });
    }
}
