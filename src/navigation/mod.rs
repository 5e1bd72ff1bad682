/// Path of the client listing; the form goes here after save or cancel.
pub const CLIENT_LIST_PATH: &str = "/clients";

/// Views reachable by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ClientList,
    NewClient,
    EditClient(i32),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::ClientList => CLIENT_LIST_PATH.to_string(),
            Route::NewClient => format!("{CLIENT_LIST_PATH}/new"),
            Route::EditClient(id) => format!("{CLIENT_LIST_PATH}/{id}/edit"),
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let rest = path.trim_end_matches('/').strip_prefix(CLIENT_LIST_PATH)?;
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Route::ClientList),
            ["new"] => Some(Route::NewClient),
            [id, "edit"] => id.parse().ok().map(Route::EditClient),
            _ => None,
        }
    }
}

/// Page routing as seen by a screen: go somewhere by path.
pub trait Navigator {
    fn navigate(&mut self, path: &str);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_parse_back_to_routes() {
        for route in [Route::ClientList, Route::NewClient, Route::EditClient(42)] {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(Route::parse("/clients/"), Some(Route::ClientList));
        assert_eq!(Route::parse("/clients/7/edit/"), Some(Route::EditClient(7)));
    }

    #[test]
    fn unknown_paths_are_rejected() {
        assert_eq!(Route::parse("/"), None);
        assert_eq!(Route::parse("/clientsx"), None);
        assert_eq!(Route::parse("/clients/abc/edit"), None);
        assert_eq!(Route::parse("/clients/1/delete"), None);
    }
}
