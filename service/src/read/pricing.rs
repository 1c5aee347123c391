//! Pricing-related read definitions.

pub mod rules {
    //! [`PricingRule`] list definitions.

    use crate::domain::{equipment, PricingRule};

    /// Selector of all the [`PricingRule`]s of an [`Equipment`], inactive
    /// ones included, the highest priority first.
    ///
    /// [`Equipment`]: crate::domain::Equipment
    #[derive(Clone, Copy, Debug)]
    pub struct Selector {
        /// ID of the [`Equipment`] to list [`PricingRule`]s of.
        ///
        /// [`Equipment`]: crate::domain::Equipment
        pub equipment_id: equipment::Id,
    }

    impl Selector {
        /// Indicates whether the provided [`PricingRule`] is listed by this
        /// [`Selector`].
        #[must_use]
        pub fn matches(&self, rule: &PricingRule) -> bool {
            rule.equipment_id == self.equipment_id
        }
    }
}

pub mod codes {
    //! [`DiscountCode`] list definitions.

    use common::DateTime;

    use crate::domain::DiscountCode;

    /// Filter of listed [`DiscountCode`]s, the most recently created first.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// Required activity of the listed [`DiscountCode`]s.
        pub is_active: Option<bool>,

        /// Moment the listed [`DiscountCode`]s must be valid at.
        pub valid_at: Option<DateTime>,
    }

    impl Filter {
        /// Indicates whether the provided [`DiscountCode`] passes this
        /// [`Filter`].
        #[must_use]
        pub fn matches(&self, code: &DiscountCode) -> bool {
            self.is_active.map_or(true, |a| code.is_active == a)
                && self.valid_at.map_or(true, |at| {
                    code.validity.start() <= at && at <= code.validity.end()
                })
        }
    }
}
