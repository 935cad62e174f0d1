use crate::yields::{YieldMode, Yields};

/// Contributions gathered for one tile or city, sorted into calculation stages.
///
/// Unlike the binary operations on [`Yields`], accumulation here is a union:
/// a mechanic or great-person category carried by any contribution becomes
/// part of the stage it lands in.
#[derive(Debug, Clone, Default)]
pub struct YieldStack {
    label: Option<String>,
    base: Yields,
    additive: Yields,
    percentage_add: Yields,
    percentage_cum: Yields,
    sources: Vec<Yields>,
}

impl YieldStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty stack whose resolved record carries `label` as provenance.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Add one contribution. Its [`YieldMode`] picks the stage:
    ///
    /// - `Base` and `Additive` sum into their stages.
    /// - `PercentageAdditive` sums with the other additive percentages.
    /// - `PercentageCumulative` compounds: `(1 + acc) * (1 + m) - 1`.
    pub fn push(&mut self, contribution: Yields) -> &mut Self {
        match contribution.mode {
            YieldMode::Base => accumulate(&mut self.base, &contribution),
            YieldMode::Additive => accumulate(&mut self.additive, &contribution),
            YieldMode::PercentageAdditive => {
                accumulate(&mut self.percentage_add, &contribution)
            }
            YieldMode::PercentageCumulative => {
                for (c, m) in contribution.iter() {
                    let acc = self.percentage_cum.get(c);
                    self.percentage_cum.set(c, (1.0 + acc) * (1.0 + m) - 1.0);
                }
            }
        }
        self.sources.push(contribution);
        self
    }

    /// Accumulated base stage.
    pub fn base(&self) -> &Yields {
        &self.base
    }

    /// Accumulated flat bonuses.
    pub fn additive(&self) -> &Yields {
        &self.additive
    }

    /// Summed additive percentages.
    pub fn percentage_add(&self) -> &Yields {
        &self.percentage_add
    }

    /// Compounded cumulative percentages.
    pub fn percentage_cum(&self) -> &Yields {
        &self.percentage_cum
    }

    /// Every contribution in push order, for per-source breakdowns.
    pub fn breakdown(&self) -> &[Yields] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Resolve into a final whole-number record. The stack is left as is,
    /// so the same contributions can be resolved again after more pushes.
    pub fn resolve(&self) -> Yields {
        let mut out = self.base.clone();
        for stage in [&self.additive, &self.percentage_add, &self.percentage_cum] {
            for (c, _) in stage.iter() {
                if !out.is_present(c) {
                    out.set(c, 0.0);
                }
            }
        }
        out.calculate(
            Some(&self.additive),
            Some(&self.percentage_add),
            Some(&self.percentage_cum),
        );
        out.mode = YieldMode::Base;
        if self.label.is_some() {
            out.name = self.label.clone();
        }
        out
    }
}

impl Extend<Yields> for YieldStack {
    fn extend<T: IntoIterator<Item = Yields>>(&mut self, iter: T) {
        for contribution in iter {
            self.push(contribution);
        }
    }
}

impl FromIterator<Yields> for YieldStack {
    fn from_iter<T: IntoIterator<Item = Yields>>(iter: T) -> Self {
        let mut stack = YieldStack::new();
        stack.extend(iter);
        stack
    }
}

/// Sum `from` into `into`, taking on any categories `into` lacks.
fn accumulate(into: &mut Yields, from: &Yields) {
    for (c, v) in from.iter() {
        into.set(c, into.get(c) + v);
    }
}

/// Resolve many independent stacks, one result per stack in input order.
#[cfg(not(feature = "parallel"))]
pub fn resolve_all(stacks: &[YieldStack]) -> Vec<Yields> {
    stacks.iter().map(YieldStack::resolve).collect()
}

/// Resolve many independent stacks, one result per stack in input order.
#[cfg(feature = "parallel")]
pub fn resolve_all(stacks: &[YieldStack]) -> Vec<Yields> {
    use rayon::prelude::*;
    stacks.par_iter().map(YieldStack::resolve).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::YieldCategory::*;

    fn additive() -> Yields {
        Yields::new(YieldMode::Additive)
    }

    #[test]
    fn stages_by_mode() {
        let mut stack = YieldStack::labeled("grassland farm");
        stack
            .push(Yields::base().with(Food, 2.0).named("grassland"))
            .push(additive().with(Food, 1.0).named("farm"))
            .push(additive().with(Food, 1.0).named("irrigation"))
            .push(
                Yields::new(YieldMode::PercentageAdditive)
                    .with(Food, 0.25)
                    .named("policy"),
            );

        assert_eq!(stack.base().get(Food), 2.0);
        assert_eq!(stack.additive().get(Food), 2.0);
        assert_eq!(stack.breakdown().len(), 4);

        let out = stack.resolve();
        // (2 + 2) * 1.25 = 5
        assert_eq!(out.get(Food), 5.0);
        assert_eq!(out.name.as_deref(), Some("grassland farm"));
    }

    #[test]
    fn cumulative_percentages_compound() {
        let mut stack = YieldStack::new();
        stack.push(Yields::base().with(Gold, 10.0));
        for _ in 0..2 {
            stack.push(Yields::new(YieldMode::PercentageCumulative).with(Gold, 0.5));
        }
        assert!((stack.percentage_cum().get(Gold) - 1.25).abs() < 1e-12);
        // 10 * 2.25 = 22.5 -> 22
        assert_eq!(stack.resolve().get(Gold), 22.0);
    }

    #[test]
    fn additive_percentages_sum() {
        let mut stack = YieldStack::new();
        stack.push(Yields::base().with(Gold, 10.0));
        for _ in 0..2 {
            stack.push(Yields::new(YieldMode::PercentageAdditive).with(Gold, 0.5));
        }
        assert_eq!(stack.resolve().get(Gold), 20.0);
    }

    #[test]
    fn extras_from_modifiers_reach_result() {
        let mut stack = YieldStack::new();
        stack.push(Yields::base().with(Culture, 1.0));
        stack.push(additive().with(Contentment, 2.0));
        let out = stack.resolve();
        assert!(out.is_present(Contentment));
        assert_eq!(out.get(Contentment), 2.0);
    }

    #[test]
    fn resolve_leaves_stack_reusable() {
        let mut stack: YieldStack = [Yields::base().with(Science, 1.5)].into_iter().collect();
        assert_eq!(stack.resolve().get(Science), 2.0);
        stack.push(additive().with(Science, 1.0));
        assert_eq!(stack.resolve().get(Science), 2.0); // 2.5 -> 2
        assert_eq!(stack.base().get(Science), 1.5);
    }

    #[test]
    fn resolve_all_keeps_order() {
        let stacks: Vec<YieldStack> = (0..8)
            .map(|i| [Yields::base().with(Production, f64::from(i))].into_iter().collect())
            .collect();
        let out = resolve_all(&stacks);
        for (i, y) in out.iter().enumerate() {
            assert_eq!(y.get(Production), i as f64);
        }
    }
}
