//! MCP server exposing loaded documentation search indexes as tools.

use crate::config::Config;
use crate::state::IndexState;
use crate::tools::{
    InspectIndexRequest, LoadIndexRequest, LookupTermRequest, ResolveObjectRequest, SearchRequest,
    handle_inspect_index, handle_load_index, handle_lookup_term, handle_resolve_object,
    handle_search,
};
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars::{self, JsonSchema, generate::SchemaSettings},
    tool, tool_handler, tool_router,
};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// MCP server for documentation search index queries
#[derive(Clone)]
pub struct IndexServer {
    /// Loaded index cache and active index
    state: Arc<IndexState>,

    config: Arc<Config>,

    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for IndexServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[tool_router]
impl IndexServer {
    pub fn new(config: Config) -> Self {
        let cache_size = NonZeroUsize::new(config.cache_size).unwrap_or(crate::state::DEFAULT_CACHE_SIZE);
        Self {
            state: Arc::new(IndexState::new(cache_size)),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    pub fn state(&self) -> &Arc<IndexState> {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads and activates the configured default index, if any.
    pub async fn preload(&self) {
        let Some(path) = &self.config.default_index else {
            return;
        };
        let path = path.display().to_string();
        match self.state.load_and_activate(&path).await {
            Ok(loaded) => tracing::info!("Default index ready: {}", loaded.path.display()),
            Err(e) => tracing::warn!("Failed to load default index {}: {}", path, e),
        }
    }

    #[tool(
        description = "Load a documentation search index (searchindex.js, or a documentation build directory containing one) and make it the default for other tools. Reports document, term and object counts plus any integrity problems.",
        input_schema = inline_schema_for_type::<LoadIndexRequest>()
    )]
    async fn load_index(
        &self,
        Parameters(request): Parameters<LoadIndexRequest>,
    ) -> std::result::Result<String, String> {
        handle_load_index(&self.state, request).await
    }

    #[tool(
        description = "Search a documentation site's index the way its own search page does: object names (directives, modules, configuration settings) and stemmed page terms, ranked by relevance. Prefix a word with '-' to exclude pages.",
        input_schema = inline_schema_for_type::<SearchRequest>()
    )]
    async fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> std::result::Result<String, String> {
        handle_search(&self.state, &self.config, request).await
    }

    #[tool(
        description = "Show which pages contain a term, with per-page weights and anchors where the index records them. The term is tried as written, then stemmed.",
        input_schema = inline_schema_for_type::<LookupTermRequest>()
    )]
    async fn lookup_term(
        &self,
        Parameters(request): Parameters<LookupTermRequest>,
    ) -> std::result::Result<String, String> {
        handle_lookup_term(&self.state, &self.config, request).await
    }

    #[tool(
        description = "Resolve a documented object by full name to its page and link anchor. Accepts configuration references like 'flow.cylc[scheduling]graph', optionally relative to a context namespace.",
        input_schema = inline_schema_for_type::<ResolveObjectRequest>()
    )]
    async fn resolve_object(
        &self,
        Parameters(request): Parameters<ResolveObjectRequest>,
    ) -> std::result::Result<String, String> {
        handle_resolve_object(&self.state, request).await
    }

    #[tool(
        description = "Summarize an index: counts, object types, pages and validation findings.",
        input_schema = inline_schema_for_type::<InspectIndexRequest>()
    )]
    async fn inspect_index(
        &self,
        Parameters(request): Parameters<InspectIndexRequest>,
    ) -> std::result::Result<String, String> {
        handle_inspect_index(&self.state, request).await
    }
}

#[tool_handler]
impl ServerHandler for IndexServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "searchindex-mcp: query generated documentation sites through their search index. \
                 Start with load_index pointing at a searchindex.js file or an HTML build directory, \
                 then use search, lookup_term, resolve_object and inspect_index.",
            )
    }
}

/// Generate an inline JSON schema for MCP tools
///
/// Unlike rmcp's default `schema_for_type()`, this sets `inline_subschemas = true`
/// so nested types appear inline instead of as `$ref` patterns.
pub fn inline_schema_for_type<T: JsonSchema>() -> Arc<JsonObject> {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let object = serde_json::to_value(schema).expect("failed to serialize schema");

    let json_object = match object {
        serde_json::Value::Object(object) => object,
        _ => panic!("Schema serialization produced non-object value"),
    };

    Arc::new(json_object)
}
