//! Querying, sorting and filtering the problem catalogue.

use crate::client::{config::ClientConfig, model::Problem, ConfigErr};
use reqwest::Url;
use std::{cmp::Ordering, collections::HashSet, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Difficulty,
    PassRate,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortKey::Id),
            "difficulty" => Ok(SortKey::Difficulty),
            "pass-rate" | "passrate" | "rate" => Ok(SortKey::PassRate),
            _ => Err(format!("unknown sort key `{}`", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn flip(self) -> SortOrder {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            key: SortKey::Id,
            order: SortOrder::Ascending,
        }
    }
}

impl SortSpec {
    pub fn new(key: SortKey, order: SortOrder) -> SortSpec {
        SortSpec { key, order }
    }

    /// Selecting the current key again flips the order; a different key
    /// starts ascending.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.order = self.order.flip();
        } else {
            self.key = key;
            self.order = SortOrder::Ascending;
        }
    }

    /// The sort reached by selecting `keys` one after another: the first
    /// selection sorts ascending, later ones go through [`SortSpec::toggle`].
    pub fn from_selections(keys: &[SortKey]) -> SortSpec {
        let mut keys = keys.iter();
        let mut spec = match keys.next() {
            Some(first) => SortSpec::new(*first, SortOrder::Ascending),
            None => SortSpec::default(),
        };
        for key in keys {
            spec.toggle(*key);
        }
        spec
    }

    pub fn reversed(self) -> SortSpec {
        SortSpec {
            order: self.order.flip(),
            ..self
        }
    }

    fn compare(&self, a: &Problem, b: &Problem) -> Ordering {
        let by_key = match self.key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Difficulty => a.difficulty_rank().cmp(&b.difficulty_rank()),
            SortKey::PassRate => a.pass_rate().total_cmp(&b.pass_rate()),
        };
        let by_key = match self.order {
            SortOrder::Ascending => by_key,
            SortOrder::Descending => by_key.reverse(),
        };
        // Ties always resolve by ascending id, whatever the order
        by_key.then_with(|| a.id.cmp(&b.id))
    }

    /// Stable sort of `problems` by key and order.
    pub fn apply(&self, problems: &mut [Problem]) {
        problems.sort_by(|a, b| self.compare(a, b));
    }
}

/// Client-side filter over one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemFilter {
    pub tag: Option<String>,
    pub unsolved_only: bool,
}

impl ProblemFilter {
    pub fn matches(&self, problem: &Problem, solved: &HashSet<i64>) -> bool {
        if let Some(tag) = &self.tag {
            // No categories never matches a tag
            if !problem.categories().iter().any(|c| c == tag) {
                return false;
            }
        }
        !(self.unsolved_only && solved.contains(&problem.id))
    }

    pub fn apply(&self, problems: Vec<Problem>, solved: &HashSet<i64>) -> Vec<Problem> {
        problems
            .into_iter()
            .filter(|p| self.matches(p, solved))
            .collect()
    }
}

/// One request against the problem catalogue, plus how to present its
/// result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemQuery {
    pub keyword: Option<String>,
    pub tag: Option<String>,
    /// 1-based page number.
    pub page: u32,
    pub size: u32,
    pub sort: SortSpec,
}

impl Default for ProblemQuery {
    fn default() -> Self {
        ProblemQuery {
            keyword: None,
            tag: None,
            page: 1,
            size: 20,
            sort: SortSpec::default(),
        }
    }
}

impl ProblemQuery {
    fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Endpoint and query parameters for this query. A non-blank keyword
    /// searches; otherwise the plain list is fetched, narrowed by tag when
    /// one is set.
    pub fn request_parts(
        &self,
        cfg: &ClientConfig,
    ) -> Result<(Url, Vec<(&'static str, String)>), ConfigErr> {
        let mut params = vec![
            ("page", self.page.max(1).to_string()),
            ("size", self.size.max(1).to_string()),
        ];
        Ok(match (self.keyword(), &self.tag) {
            (Some(keyword), _) => {
                params.insert(0, ("keyword", keyword.to_owned()));
                (cfg.problem_search_endpoint()?, params)
            }
            (None, Some(tag)) => {
                params.push(("tag", tag.clone()));
                (cfg.problem_list_endpoint()?, params)
            }
            (None, None) => (cfg.problem_list_endpoint()?, params),
        })
    }

    /// Filter a fetched page and sort what remains.
    pub fn present(
        &self,
        problems: Vec<Problem>,
        filter: &ProblemFilter,
        solved: &HashSet<i64>,
    ) -> Vec<Problem> {
        let mut problems = filter.apply(problems, solved);
        self.sort.apply(&mut problems);
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn problem(id: i64, difficulty: Option<&str>, subs: Option<i64>, acs: Option<i64>) -> Problem {
        Problem {
            id,
            title: format!("P{}", id),
            difficulty: difficulty.map(str::to_owned),
            number_of_submissions: subs,
            number_of_accepted: acs,
            categories: None,
        }
    }

    fn ids(problems: &[Problem]) -> Vec<i64> {
        problems.iter().map(|p| p.id).collect()
    }

    #[test]
    fn difficulty_sort_breaks_ties_by_id() {
        let mut ps = vec![
            problem(5, Some("HARD"), None, None),
            problem(3, Some("EASY"), None, None),
            problem(4, None, None, None),
            problem(1, Some("HARD"), None, None),
            problem(2, Some("EASY"), None, None),
        ];
        SortSpec::new(SortKey::Difficulty, SortOrder::Ascending).apply(&mut ps);
        assert_eq!(ids(&ps), vec![4, 2, 3, 1, 5]);

        SortSpec::new(SortKey::Difficulty, SortOrder::Descending).apply(&mut ps);
        assert_eq!(ids(&ps), vec![1, 5, 2, 3, 4]);
    }

    #[test]
    fn missing_counts_sort_as_zero_pass_rate() {
        let mut ps = vec![
            problem(1, None, Some(10), Some(5)),
            problem(2, None, None, None),
            problem(3, None, Some(0), Some(0)),
            problem(4, None, Some(4), Some(4)),
        ];
        SortSpec::new(SortKey::PassRate, SortOrder::Descending).apply(&mut ps);
        assert_eq!(ids(&ps), vec![4, 1, 2, 3]);
    }

    #[test]
    fn toggle_flips_then_resets() {
        let mut spec = SortSpec::default();
        spec.toggle(SortKey::Id);
        assert_eq!(spec, SortSpec::new(SortKey::Id, SortOrder::Descending));
        spec.toggle(SortKey::PassRate);
        assert_eq!(spec, SortSpec::new(SortKey::PassRate, SortOrder::Ascending));
        spec.toggle(SortKey::PassRate);
        assert_eq!(spec.order, SortOrder::Descending);
    }

    #[test]
    fn repeated_selection_flips_order() {
        assert_eq!(SortSpec::from_selections(&[]), SortSpec::default());
        assert_eq!(
            SortSpec::from_selections(&[SortKey::Difficulty]),
            SortSpec::new(SortKey::Difficulty, SortOrder::Ascending)
        );
        assert_eq!(
            SortSpec::from_selections(&[SortKey::Difficulty, SortKey::Difficulty]),
            SortSpec::new(SortKey::Difficulty, SortOrder::Descending)
        );
        let spec = SortSpec::from_selections(&[SortKey::PassRate, SortKey::PassRate, SortKey::Id]);
        assert_eq!(spec, SortSpec::new(SortKey::Id, SortOrder::Ascending));
        assert_eq!(spec.reversed().order, SortOrder::Descending);
    }

    #[test]
    fn tag_filter_excludes_uncategorized() {
        let mut tagged = problem(1, None, None, None);
        tagged.categories = Some(vec!["dp".into(), "graph".into()]);
        let mut other = problem(2, None, None, None);
        other.categories = Some(vec!["math".into()]);
        let bare = problem(3, None, None, None);

        let filter = ProblemFilter {
            tag: Some("dp".into()),
            unsolved_only: false,
        };
        let kept = filter.apply(vec![tagged, other, bare], &HashSet::new());
        assert_eq!(ids(&kept), vec![1]);
    }

    #[test]
    fn unsolved_only_hides_solved() {
        let filter = ProblemFilter {
            tag: None,
            unsolved_only: true,
        };
        let solved = HashSet::from([2]);
        let kept = filter.apply(
            vec![
                problem(1, None, None, None),
                problem(2, None, None, None),
                problem(3, None, None, None),
            ],
            &solved,
        );
        assert_eq!(ids(&kept), vec![1, 3]);
    }

    #[test]
    fn request_parts_picks_endpoint() {
        let cfg = ClientConfig::default();

        let (url, params) = ProblemQuery::default().request_parts(&cfg).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/problem/list");
        assert_eq!(
            params,
            vec![("page", "1".to_owned()), ("size", "20".to_owned())]
        );

        let query = ProblemQuery {
            tag: Some("dp".into()),
            ..Default::default()
        };
        let (url, params) = query.request_parts(&cfg).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/problem/list");
        assert_eq!(params.last(), Some(&("tag", "dp".to_owned())));

        // Keyword wins over tag; blank keywords are ignored
        let query = ProblemQuery {
            keyword: Some(" sum ".into()),
            tag: Some("dp".into()),
            ..Default::default()
        };
        let (url, params) = query.request_parts(&cfg).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/problem/search");
        assert_eq!(params[0], ("keyword", "sum".to_owned()));

        let query = ProblemQuery {
            keyword: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(
            query.request_parts(&cfg).unwrap().0.as_str(),
            "http://localhost:8080/api/problem/list"
        );
    }
}
