pub mod address;
pub mod role;
pub mod session;
pub mod user;

pub use address::{Address, AddressResponse, NewAddress};
pub use role::{aggregate_roles, Permission, Role, RolePermissionRow, RoleWithPermissions};
pub use session::{SessionData, SessionUser};
pub use user::{
    NewUser, RoleResponse, User, UserResponse, UserWithRoles, UserWithRolesResponse,
};
