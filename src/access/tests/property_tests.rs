//! Property tests over randomly generated org charts

mod common;

use crm_access::store::{InMemoryOrgStore, OrgSnapshot};
use crm_access::types::{Department, OrgUser, Role, Team};
use crm_access::{AccessLevel, EffectiveLevel, PrincipalSet, ScopeSetBuilder};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

const DEPTH: usize = 64;

/// A generated org: users hang off a department forest and a manager forest,
/// teams optionally hang off a department
#[derive(Debug, Clone)]
struct GeneratedOrg {
    departments: Vec<Option<usize>>,
    users: Vec<(Option<usize>, Option<usize>)>,
    teams: Vec<Option<usize>>,
    memberships: Vec<(usize, usize)>,
}

fn org_strategy() -> impl Strategy<Value = GeneratedOrg> {
    (1usize..6, 2usize..12, 0usize..4).prop_flat_map(|(departments, users, teams)| {
        let department_parents = (0..departments)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    proptest::option::of(0..i).boxed()
                }
            })
            .collect::<Vec<_>>();
        // Managers always precede their reports, so the manager graph is a forest
        let user_links = (0..users)
            .map(move |i| {
                let department = proptest::option::of(0..departments);
                let manager = if i == 0 {
                    Just(None).boxed()
                } else {
                    proptest::option::of(0..i).boxed()
                };
                (department, manager)
            })
            .collect::<Vec<_>>();
        let team_departments =
            proptest::collection::vec(proptest::option::of(0..departments), teams);
        let memberships = if teams == 0 {
            Just(Vec::new()).boxed()
        } else {
            proptest::collection::vec((0..users, 0..teams), 0..users * 2).boxed()
        };
        (department_parents, user_links, team_departments, memberships).prop_map(
            |(departments, users, teams, memberships)| GeneratedOrg {
                departments,
                users,
                teams,
                memberships,
            },
        )
    })
}

struct Materialized {
    store: Arc<InMemoryOrgStore>,
    users: Vec<OrgUser>,
    department_ids: Vec<Uuid>,
    teams: Vec<Team>,
}

fn materialize(org: &GeneratedOrg) -> Materialized {
    let role = Role::new(Uuid::new_v4());
    let mut snapshot = OrgSnapshot::new().with_role(role.clone());

    let department_ids: Vec<Uuid> = org.departments.iter().map(|_| Uuid::new_v4()).collect();
    for (i, parent) in org.departments.iter().enumerate() {
        let department = match parent {
            Some(p) => Department::child_of(department_ids[i], department_ids[*p]),
            None => Department::root(department_ids[i]),
        };
        snapshot = snapshot.with_department(department);
    }

    let mut users: Vec<OrgUser> = Vec::new();
    for (department, manager) in &org.users {
        let mut user = OrgUser::new(Uuid::new_v4(), role.id);
        if let Some(d) = department {
            user = user.in_department(department_ids[*d]);
        }
        if let Some(m) = manager {
            user = user.reporting_to(users[*m].id);
        }
        users.push(user);
    }
    for user in &users {
        snapshot = snapshot.with_user(user.clone());
    }

    let teams: Vec<Team> = org
        .teams
        .iter()
        .map(|department| {
            let team = Team::new(Uuid::new_v4());
            match department {
                Some(d) => team.in_department(department_ids[*d]),
                None => team,
            }
        })
        .collect();
    for team in &teams {
        snapshot = snapshot.with_team(*team);
    }
    for (user, team) in &org.memberships {
        snapshot = snapshot.with_membership(users[*user].id, teams[*team].id);
    }

    Materialized {
        store: Arc::new(InMemoryOrgStore::from_snapshot(snapshot)),
        users,
        department_ids,
        teams,
    }
}

/// Department closure computed directly from the generated indices
fn expected_department_closure(org: &GeneratedOrg, user: usize) -> HashSet<usize> {
    let mut home: HashSet<usize> = org.users[user].0.into_iter().collect();
    for (member, team) in &org.memberships {
        if *member == user {
            home.extend(org.teams[*team]);
        }
    }

    let mut expected = HashSet::from([user]);
    if home.is_empty() {
        return expected;
    }

    // Parents precede children, so one forward pass closes the subtree
    let mut subtree = home;
    for (i, parent) in org.departments.iter().enumerate() {
        if parent.is_some_and(|p| subtree.contains(&p)) {
            subtree.insert(i);
        }
    }

    for (i, (department, _)) in org.users.iter().enumerate() {
        if department.is_some_and(|d| subtree.contains(&d)) {
            expected.insert(i);
        }
    }
    for (member, team) in &org.memberships {
        if org.teams[*team].is_some_and(|d| subtree.contains(&d)) {
            expected.insert(*member);
        }
    }
    expected
}

fn closure(builder: &ScopeSetBuilder, user: &OrgUser, level: AccessLevel) -> PrincipalSet {
    tokio_test::block_on(builder.build(user, level))
        .unwrap()
        .unwrap()
}

const RESTRICTED: [AccessLevel; 4] = [
    AccessLevel::Own,
    AccessLevel::Team,
    AccessLevel::Department,
    AccessLevel::ReportingLine,
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_requester_always_in_closure(org in org_strategy()) {
        let m = materialize(&org);
        let builder = ScopeSetBuilder::new(m.store.clone(), DEPTH);

        for user in &m.users {
            for level in RESTRICTED {
                let set = closure(&builder, user, level);
                prop_assert!(set.contains(&user.id), "{} missing from own {} closure", user.id, level);
            }
        }
    }

    #[test]
    fn prop_team_closure_is_symmetric(org in org_strategy()) {
        let m = materialize(&org);
        let builder = ScopeSetBuilder::new(m.store.clone(), DEPTH);

        for a in &m.users {
            let from_a = closure(&builder, a, AccessLevel::Team);
            for b in &m.users {
                let from_b = closure(&builder, b, AccessLevel::Team);
                prop_assert_eq!(from_a.contains(&b.id), from_b.contains(&a.id));
            }
        }
    }

    #[test]
    fn prop_reporting_line_points_downward(org in org_strategy()) {
        let m = materialize(&org);
        let builder = ScopeSetBuilder::new(m.store.clone(), DEPTH);

        for a in &m.users {
            let from_a = closure(&builder, a, AccessLevel::ReportingLine);
            for b in m.users.iter().filter(|b| b.id != a.id && from_a.contains(&b.id)) {
                let from_b = closure(&builder, b, AccessLevel::ReportingLine);
                prop_assert!(!from_b.contains(&a.id));
            }
        }
    }

    #[test]
    fn prop_department_closure_matches_org_chart(org in org_strategy()) {
        let m = materialize(&org);
        let builder = ScopeSetBuilder::new(m.store.clone(), DEPTH);

        for (i, user) in m.users.iter().enumerate() {
            let expected: PrincipalSet = expected_department_closure(&org, i)
                .into_iter()
                .map(|j| m.users[j].id)
                .collect();
            prop_assert_eq!(closure(&builder, user, AccessLevel::Department), expected);
        }
    }

    #[test]
    fn prop_own_closure_is_singleton(org in org_strategy()) {
        let m = materialize(&org);
        let builder = ScopeSetBuilder::new(m.store.clone(), DEPTH);

        for user in &m.users {
            prop_assert_eq!(closure(&builder, user, AccessLevel::Own), PrincipalSet::only(user.id));
        }
    }

    #[test]
    fn prop_resolution_is_idempotent(org in org_strategy()) {
        let m = materialize(&org);
        let builder = ScopeSetBuilder::new(m.store.clone(), DEPTH);

        for user in &m.users {
            for level in RESTRICTED {
                prop_assert_eq!(closure(&builder, user, level), closure(&builder, user, level));
            }
        }
    }

    #[test]
    fn prop_department_closure_grows_with_new_sub_department(
        org in org_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let m = materialize(&org);
        let builder = ScopeSetBuilder::new(m.store.clone(), DEPTH);
        let picked = pick.index(m.users.len());
        let user = m.users[picked].clone();
        let before: Vec<PrincipalSet> = m
            .users
            .iter()
            .map(|u| closure(&builder, u, AccessLevel::Department))
            .collect();

        // Home department either assigned directly or reached through a team
        let home = user.department_id.or_else(|| {
            org.memberships
                .iter()
                .filter(|(member, _)| *member == picked)
                .find_map(|(_, team)| m.teams[*team].department_id)
        });

        // Hang a fresh sub-department under it, staffed directly and through a team
        if let Some(parent) = home {
            prop_assert!(m.department_ids.contains(&parent));
            let child = Department::child_of(Uuid::new_v4(), parent);
            let team = Team::new(Uuid::new_v4()).in_department(child.id);
            let assigned = OrgUser::new(Uuid::new_v4(), user.role_id).in_department(child.id);
            let team_only = OrgUser::new(Uuid::new_v4(), user.role_id);
            tokio_test::block_on(async {
                m.store.put_department(child).await;
                m.store.put_team(team).await;
                m.store.put_user(assigned.clone()).await;
                m.store.put_user(team_only.clone()).await;
                m.store.add_membership(team_only.id, team.id).await;
            });

            let after = closure(&builder, &user, AccessLevel::Department);
            prop_assert!(after.contains(&assigned.id));
            prop_assert!(after.contains(&team_only.id));
            prop_assert!(after.contains(&user.id));
        }

        for (u, old) in m.users.iter().zip(before) {
            let new = closure(&builder, u, AccessLevel::Department);
            prop_assert!(old.iter().all(|id| new.contains(id)));
        }
    }

    #[test]
    fn prop_unrecognized_level_never_grants_all(raw in "\\PC{0,16}") {
        let recognized = AccessLevel::VARIANTS
            .iter()
            .any(|v| v.as_str().eq_ignore_ascii_case(raw.trim()));
        prop_assume!(!recognized);

        let role = Role::new(Uuid::new_v4()).with_module_access("contacts", raw.as_str());
        let effective = EffectiveLevel::for_role(&role, "contacts");
        prop_assert_eq!(effective.level, AccessLevel::Own);
        prop_assert!(effective.defaulted);
        prop_assert!(!crm_access::level::role_has_full_access(&role, "contacts"));
    }
}
