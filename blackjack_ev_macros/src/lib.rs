use proc_macro::TokenStream as TokenStream1;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};

/// This macro is added before a method of the `Table` struct in the impl block.
/// Use this macro to first check if current game phase is exactly the phase in
/// the attribute.
///
/// For example, `#[allowed_phase(PlaceBets)]` will make a method first check
/// if current game phase is `PlaceBets`. If not, the method returns
/// `BlackjackError::WrongPhase` naming the method and the required phase.
///
/// The method must return `BlackjackResult<_>` and the enclosing module must
/// have `GamePhase` in scope.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream1, item: TokenStream1) -> TokenStream1 {
    let mut ast: syn::ImplItemFn =
        syn::parse(item).expect("allowed_phase can only be applied to methods");
    let phase: syn::Ident =
        syn::parse(attr).expect("allowed_phase expects a single GamePhase variant");
    let method = ast.sig.ident.to_string();
    let phase_name = phase.to_string();

    let early_return: TokenStream2 = quote! {
        if self.current_game_phase != GamePhase::#phase {
            return Err(crate::BlackjackError::WrongPhase {
                method: #method,
                phase: #phase_name,
            });
        }
    };
    let early_return: syn::Stmt =
        syn::parse2(early_return).expect("the phase guard is a valid statement");
    ast.block.stmts.insert(0, early_return);
    ast.into_token_stream().into()
}
